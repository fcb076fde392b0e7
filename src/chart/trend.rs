//! Period bars with mean, moving-average and trend overlays.

use std::collections::BTreeMap;

use super::figure::{
    Annotation, Axis, BarTrace, Color, ColorValue, Coord, Figure, Font, Layout, LegendPosition,
    Line, Marker, ScatterTrace, Series, Title,
};
use super::palette;
use super::{fillable_span, ChartResult};
use crate::format;
use crate::stats;
use crate::table::{group_by, Aggregation, ResultTable};

/// How years absent from the data are filled between the first and last year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFill {
    /// Missing years get a zero bar.
    Zero,
    /// Missing years are kept on the axis with no bar.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendOptions {
    pub x_col: String,
    pub y_col: String,
    pub title: String,
    /// Treat `x_col` as integer years (sorted, optionally gap-filled).
    pub x_is_year: bool,
    pub gap_fill: Option<GapFill>,
    pub show_mean: bool,
    pub show_moving_average: bool,
    pub ma_window: usize,
    pub show_trend: bool,
    pub show_pct_change: bool,
    pub x_label: Option<String>,
    pub y_label: String,
    pub legend: LegendPosition,
    pub above_mean_color: String,
    pub below_mean_color: String,
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            x_col: String::new(),
            y_col: String::new(),
            title: String::new(),
            x_is_year: true,
            gap_fill: Some(GapFill::Zero),
            show_mean: true,
            show_moving_average: false,
            ma_window: 3,
            show_trend: true,
            show_pct_change: true,
            x_label: None,
            y_label: "Quantidade".into(),
            legend: LegendPosition::Top,
            above_mean_color: palette::PRIMARY.into(),
            below_mean_color: palette::SECONDARY.into(),
        }
    }
}

impl TrendOptions {
    pub fn new(x_col: &str, y_col: &str) -> Self {
        Self {
            x_col: x_col.into(),
            y_col: y_col.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn y_label(mut self, label: &str) -> Self {
        self.y_label = label.into();
        self
    }

    pub fn gap_fill(mut self, fill: Option<GapFill>) -> Self {
        self.gap_fill = fill;
        self
    }

    pub fn moving_average(mut self, window: usize) -> Self {
        self.show_moving_average = window > 0;
        self.ma_window = window;
        self
    }

    pub fn categorical(mut self) -> Self {
        self.x_is_year = false;
        self.gap_fill = None;
        self
    }
}

/// The x positions and values a trend chart plots.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSeries {
    pub x: Vec<Coord>,
    pub values: Vec<Option<f64>>,
}

/// Sum the value column per period, sort years, and fill gaps as requested.
pub fn period_series(table: &ResultTable, opts: &TrendOptions) -> ChartResult<PeriodSeries> {
    table.require_column(&opts.y_col)?;

    if !opts.x_is_year {
        let groups = group_by(table, &opts.x_col, &Aggregation::Sum(opts.y_col.clone()))?;
        return Ok(PeriodSeries {
            x: groups.iter().map(|g| Coord::Cat(g.key.clone())).collect(),
            values: groups.iter().map(|g| Some(g.value)).collect(),
        });
    }

    let years = table.int(&opts.x_col)?;
    let values = table.numeric(&opts.y_col)?;
    let mut by_year: BTreeMap<i64, f64> = BTreeMap::new();
    for (year, value) in years.into_iter().zip(values) {
        // Rows without a year cannot be placed on the axis.
        if let Some(y) = year {
            *by_year.entry(y).or_insert(0.0) += value;
        }
    }

    let (Some(&first), Some(&last)) = (by_year.keys().next(), by_year.keys().next_back()) else {
        return Ok(PeriodSeries {
            x: Vec::new(),
            values: Vec::new(),
        });
    };

    let (x, values) = match opts.gap_fill {
        Some(fill) if fillable_span(first, last) => (first..=last)
            .map(|y| {
                let v = match (by_year.get(&y), fill) {
                    (Some(v), _) => Some(*v),
                    (None, GapFill::Zero) => Some(0.0),
                    (None, GapFill::Missing) => None,
                };
                (Coord::Num(y as f64), v)
            })
            .unzip(),
        _ => by_year
            .iter()
            .map(|(y, v)| (Coord::Num(*y as f64), Some(*v)))
            .unzip(),
    };
    Ok(PeriodSeries { x, values })
}

fn coords_to_series(x: &[Coord]) -> Series {
    if x.iter().all(|c| matches!(c, Coord::Num(_))) {
        Series::Numbers(
            x.iter()
                .map(|c| match c {
                    Coord::Num(n) => Some(*n),
                    Coord::Cat(_) => None,
                })
                .collect(),
        )
    } else {
        Series::Labels(
            x.iter()
                .map(|c| match c {
                    Coord::Num(n) => n.to_string(),
                    Coord::Cat(s) => s.clone(),
                })
                .collect(),
        )
    }
}

/// Bars per period coloured against the mean, with optional overlays and
/// period-over-period change annotations.
pub fn bar_yoy_trend(table: &ResultTable, opts: &TrendOptions) -> ChartResult<Figure> {
    let series = period_series(table, opts)?;
    if series.values.iter().all(Option::is_none) {
        return Ok(Figure::no_data(&opts.title));
    }

    let x = coords_to_series(&series.x);
    let values = &series.values;
    let mean = stats::mean(values);

    let colors = values
        .iter()
        .map(|v| {
            let above = matches!((v, mean), (Some(v), Some(m)) if *v >= m);
            ColorValue::Css(if above {
                opts.above_mean_color.clone()
            } else {
                opts.below_mean_color.clone()
            })
        })
        .collect();

    let mut fig = Figure::new(&opts.title);
    fig.push(BarTrace {
        name: Some(opts.y_label.clone()),
        x: x.clone(),
        y: Series::Numbers(values.clone()),
        marker: Some(Marker {
            color: Some(Color::Each(colors)),
            ..Default::default()
        }),
        text: Some(
            values
                .iter()
                .map(|v| v.map(format::thousands_f64).unwrap_or_default())
                .collect(),
        ),
        textposition: Some("inside".into()),
        hovertemplate: Some("<b>%{x}</b><br>%{y:,}<extra></extra>".into()),
        ..Default::default()
    });

    if opts.show_mean {
        if let Some(m) = mean {
            fig.push(ScatterTrace {
                name: Some(format!("Média ({})", format::decimal_br(m, 1))),
                x: x.clone(),
                y: Series::Numbers(vec![Some(m); values.len()]),
                mode: "lines".into(),
                line: Some(Line::dashed(palette::MEAN_LINE, 2.0)),
                ..Default::default()
            });
        }
    }

    if opts.show_moving_average && opts.ma_window > 0 {
        fig.push(ScatterTrace {
            name: Some(format!("Média móvel ({} períodos)", opts.ma_window)),
            x: x.clone(),
            y: Series::Numbers(stats::moving_average(values, opts.ma_window)),
            mode: "lines+markers".into(),
            line: Some(Line::solid(palette::MOVING_AVERAGE, 2.0)),
            connectgaps: Some(false),
            ..Default::default()
        });
    }

    let present = values.iter().filter(|v| v.is_some()).count();
    if opts.show_trend && present >= 2 {
        fig.push(ScatterTrace {
            name: Some("Tendência linear".into()),
            x: x.clone(),
            y: Series::Numbers(stats::linear_trend(values)),
            mode: "lines".into(),
            line: Some(Line {
                dash: Some("dot".into()),
                ..Line::solid(palette::TREND_LINE, 2.0)
            }),
            ..Default::default()
        });
    }

    let mut annotations = Vec::new();
    if opts.show_pct_change {
        for ((xc, v), change) in series
            .x
            .iter()
            .zip(values)
            .zip(stats::pct_change(values))
        {
            let (Some(v), Some(change)) = (v, change) else {
                continue;
            };
            annotations.push(Annotation {
                x: xc.clone(),
                y: Coord::Num(*v),
                text: format::signed_pct(change, 1),
                showarrow: false,
                yanchor: Some("bottom".into()),
                yshift: Some(4.0),
                font: Some(Font::sized(11).with_color(if change >= 0.0 {
                    "#15803D"
                } else {
                    "#B91C1C"
                })),
                ..Default::default()
            });
        }
    }

    let x_label = opts.x_label.as_deref().unwrap_or(&opts.x_col);
    fig.layout = Layout {
        title: Some(Title::centered(&opts.title)),
        xaxis: Some(if opts.x_is_year {
            Axis::years(x_label)
        } else {
            Axis::titled(x_label)
        }),
        yaxis: Some(Axis {
            gridcolor: Some(palette::GRID.into()),
            ..Axis::titled(&opts.y_label)
        }),
        legend: Some(opts.legend.legend()),
        plot_bgcolor: Some(palette::BACKGROUND.into()),
        bargap: Some(0.2),
        annotations,
        ..Default::default()
    };
    Ok(fig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnSpec, DataType, Value};

    fn years(rows: &[(i64, i64)]) -> ResultTable {
        ResultTable::new(
            vec![
                ColumnSpec::new("ano", DataType::Int),
                ColumnSpec::new("qtd", DataType::Int),
            ],
            rows.iter()
                .map(|(y, v)| vec![Value::Int(*y), Value::Int(*v)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_gap_fill_missing_keeps_year() {
        let opts = TrendOptions::new("ano", "qtd").gap_fill(Some(GapFill::Missing));
        let s = period_series(&years(&[(2020, 7), (2018, 5)]), &opts).unwrap();
        assert_eq!(
            s.x,
            vec![Coord::Num(2018.0), Coord::Num(2019.0), Coord::Num(2020.0)]
        );
        assert_eq!(s.values, vec![Some(5.0), None, Some(7.0)]);
    }

    #[test]
    fn test_no_gap_fill() {
        let opts = TrendOptions::new("ano", "qtd").gap_fill(None);
        let s = period_series(&years(&[(2018, 5), (2020, 7)]), &opts).unwrap();
        assert_eq!(s.values.len(), 2);
    }

    #[test]
    fn test_duplicate_years_are_summed() {
        let opts = TrendOptions::new("ano", "qtd");
        let s = period_series(&years(&[(2018, 5), (2018, 2)]), &opts).unwrap();
        assert_eq!(s.values, vec![Some(7.0)]);
    }
}
