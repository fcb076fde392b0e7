//! Horizontal Pareto chart with cumulative curve and ABC bands.

use super::figure::{
    Annotation, Axis, AxisTitle, BarTrace, Color, ColorBar, ColorValue, Coord, Figure, Font,
    Legend, Line, Margin, Marker, ScatterTrace, Series, Shape, Title,
};
use super::palette;
use super::{ChartError, ChartResult};
use crate::format;
use crate::stats::{self, ParetoRow};
use crate::table::{group_by, Aggregation, ResultTable};

/// How categories are counted when no value column is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountMethod {
    /// Distinct values of the id column; degrades to `Rows` without one.
    #[default]
    Distinct,
    Rows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParetoOptions {
    pub category_col: String,
    /// Summed when set; takes precedence over counting.
    pub value_col: Option<String>,
    pub id_col: Option<String>,
    pub method: CountMethod,
    pub title: String,
    pub value_label: String,
    /// Defaults to the category column name.
    pub category_label: Option<String>,
    pub colorbar_title: String,
    pub colorscale: String,
    pub curve_color: String,
    pub threshold_a: f64,
    pub threshold_b: f64,
    /// Category forced to `highlight_color` regardless of rank.
    pub highlight_category: Option<String>,
    pub highlight_color: String,
    pub width: u32,
    pub height: u32,
    pub margin: Margin,
}

impl Default for ParetoOptions {
    fn default() -> Self {
        Self {
            category_col: String::new(),
            value_col: None,
            id_col: None,
            method: CountMethod::Distinct,
            title: "Pareto".into(),
            value_label: "Quantidade".into(),
            category_label: None,
            colorbar_title: "Quantidade".into(),
            colorscale: "Blues".into(),
            curve_color: "black".into(),
            threshold_a: 80.0,
            threshold_b: 95.0,
            highlight_category: Some("Não identificado".into()),
            highlight_color: "crimson".into(),
            width: 1200,
            height: 800,
            margin: Margin::new(300, 140, 100, 60),
        }
    }
}

impl ParetoOptions {
    /// Sum `value_col` per category.
    pub fn sum(category_col: &str, value_col: &str) -> Self {
        Self {
            category_col: category_col.into(),
            value_col: Some(value_col.into()),
            ..Default::default()
        }
    }

    /// Count distinct `id_col` values per category.
    pub fn distinct(category_col: &str, id_col: &str) -> Self {
        Self {
            category_col: category_col.into(),
            id_col: Some(id_col.into()),
            ..Default::default()
        }
    }

    /// Count rows per category.
    pub fn rows(category_col: &str) -> Self {
        Self {
            category_col: category_col.into(),
            method: CountMethod::Rows,
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn value_label(mut self, label: &str) -> Self {
        self.value_label = label.into();
        self
    }

    pub fn colorbar_title(mut self, title: &str) -> Self {
        self.colorbar_title = title.into();
        self
    }

    pub fn thresholds(mut self, a: f64, b: f64) -> Self {
        self.threshold_a = a;
        self.threshold_b = b;
        self
    }

    pub fn highlight(mut self, category: Option<&str>, color: &str) -> Self {
        self.highlight_category = category.map(String::from);
        self.highlight_color = color.into();
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        let (a, b) = (self.threshold_a, self.threshold_b);
        if !(a > 0.0 && a < b && b <= 100.0) {
            return Err(ChartError::InvalidThresholds { a, b });
        }
        Ok(())
    }

    fn aggregation(&self) -> Aggregation {
        match (&self.value_col, &self.id_col, self.method) {
            (Some(v), _, _) => Aggregation::Sum(v.clone()),
            (None, Some(id), CountMethod::Distinct) => Aggregation::CountDistinct(id.clone()),
            _ => Aggregation::Rows,
        }
    }
}

/// Group, rank and render a horizontal Pareto chart.
pub fn pareto_barh(table: &ResultTable, opts: &ParetoOptions) -> ChartResult<Figure> {
    opts.validate()?;
    table.require_column(&opts.category_col)?;
    let agg = opts.aggregation();
    let groups = group_by(table, &opts.category_col, &agg)?;
    if groups.is_empty() {
        return Ok(Figure::no_data(&opts.title));
    }

    let rows = stats::pareto(groups, opts.threshold_a, opts.threshold_b);
    tracing::debug!(
        categories = rows.len(),
        aggregation = ?agg,
        "building pareto chart"
    );

    let mut fig = Figure::new(&opts.title);
    fig.push(bars(&rows, opts));
    fig.push(curve(&rows, opts));
    fig.layout = layout(&rows, opts);
    Ok(fig)
}

fn label(row: &ParetoRow) -> String {
    format!(
        "{} ({})",
        format::thousands(row.value.trunc() as i64),
        format::pct(row.pct, 1)
    )
}

fn bars(rows: &[ParetoRow], opts: &ParetoOptions) -> BarTrace {
    let colors = rows
        .iter()
        .map(|r| match &opts.highlight_category {
            Some(h) if *h == r.key => ColorValue::Css(opts.highlight_color.clone()),
            _ => ColorValue::Scale(r.value),
        })
        .collect();

    BarTrace {
        name: Some("Contagem".into()),
        x: Series::numbers(rows.iter().map(|r| r.value)),
        y: Series::labels(rows.iter().map(|r| r.key.clone())),
        orientation: Some("h".into()),
        marker: Some(Marker {
            color: Some(Color::Each(colors)),
            colorscale: Some(opts.colorscale.clone()),
            colorbar: Some(ColorBar {
                title: Some(opts.colorbar_title.clone()),
                x: Some(1.10),
                xanchor: Some("left".into()),
            }),
            ..Default::default()
        }),
        text: Some(rows.iter().map(label).collect()),
        textposition: Some("outside".into()),
        hovertemplate: Some("<b>%{y}</b><br>Número: %{x}<extra></extra>".into()),
        showlegend: None,
    }
}

fn curve(rows: &[ParetoRow], opts: &ParetoOptions) -> ScatterTrace {
    ScatterTrace {
        name: Some("Acumulado (%)".into()),
        x: Series::numbers(rows.iter().map(|r| r.cum_pct)),
        y: Series::labels(rows.iter().map(|r| r.key.clone())),
        mode: "lines+markers+text".into(),
        line: Some(Line {
            shape: Some("spline".into()),
            ..Line::solid(&opts.curve_color, 3.0)
        }),
        marker: Some(Marker {
            size: Some(8.0),
            color: Some(Color::Single("white".into())),
            line: Some(Line::solid(&opts.curve_color, 2.0)),
            ..Default::default()
        }),
        text: Some(rows.iter().map(|r| format::pct(r.cum_pct, 1)).collect()),
        textposition: Some("middle right".into()),
        xaxis: Some("x2".into()),
        hovertemplate: Some("<b>%{y}</b><br>Acumulado: %{x:.1f}%<extra></extra>".into()),
        cliponaxis: Some(false),
        connectgaps: None,
    }
}

fn layout(rows: &[ParetoRow], opts: &ParetoOptions) -> super::figure::Layout {
    let max = rows.iter().map(|r| r.value).fold(0.0_f64, f64::max);
    let xmax = if max > 0.0 { max * 1.45 } else { 1.0 };
    let (a, b) = (opts.threshold_a, opts.threshold_b);

    let threshold = |x: f64| Shape {
        shape_type: "line".into(),
        xref: "x2".into(),
        yref: "paper".into(),
        x0: x,
        x1: x,
        y0: 0.0,
        y1: 1.0,
        line: Some(Line::dashed("gray", 2.0)),
        ..Default::default()
    };
    let band = |x0: f64, x1: f64, fill: &str| Shape {
        shape_type: "rect".into(),
        xref: "x2".into(),
        yref: "paper".into(),
        x0,
        x1,
        y0: 0.0,
        y1: 1.0,
        line: Some(Line::invisible()),
        fillcolor: Some(fill.into()),
        layer: Some("below".into()),
    };
    let band_label = |x: f64, text: &str| Annotation {
        x: Coord::Num(x),
        y: Coord::Num(0.5),
        xref: Some("x2".into()),
        yref: Some("paper".into()),
        text: format!("<b>{}</b>", text),
        showarrow: false,
        font: Some(Font::sized(22).with_color(palette::BAND_LABEL)),
        ..Default::default()
    };

    super::figure::Layout {
        title: Some(Title {
            font: Some(
                Font::sized(22)
                    .with_family("Arial Black")
                    .with_color(palette::TITLE),
            ),
            ..Title::centered(&opts.title)
        }),
        width: Some(opts.width),
        height: Some(opts.height),
        margin: Some(opts.margin.clone()),
        paper_bgcolor: Some(palette::BACKGROUND.into()),
        plot_bgcolor: Some(palette::BACKGROUND.into()),
        xaxis: Some(Axis {
            title: Some(AxisTitle {
                font: Some(Font::sized(18)),
                ..AxisTitle::new(&opts.value_label)
            }),
            domain: Some([0.0, 0.80]),
            range: Some([0.0, xmax]),
            showgrid: Some(true),
            gridcolor: Some(palette::GRID.into()),
            tickfont: Some(Font::sized(14)),
            ..Default::default()
        }),
        xaxis2: Some(Axis {
            title: Some(AxisTitle {
                font: Some(Font::sized(16)),
                ..AxisTitle::new("Acumulado (%)")
            }),
            overlaying: Some("x".into()),
            side: Some("top".into()),
            domain: Some([0.0, 0.80]),
            range: Some([0.0, 100.0]),
            tick0: Some(0.0),
            dtick: Some(20.0),
            ticksuffix: Some("%".into()),
            showgrid: Some(false),
            tickfont: Some(Font::sized(12)),
            ..Default::default()
        }),
        yaxis: Some(Axis {
            title: Some(AxisTitle {
                font: Some(Font::sized(18)),
                ..AxisTitle::new(
                    opts.category_label
                        .as_deref()
                        .unwrap_or(&opts.category_col),
                )
            }),
            autorange: Some("reversed".into()),
            tickfont: Some(Font::sized(16)),
            ..Default::default()
        }),
        legend: Some(Legend {
            orientation: Some("h".into()),
            x: Some(0.5),
            y: Some(-0.2),
            xanchor: Some("center".into()),
            yanchor: None,
        }),
        shapes: vec![
            threshold(a),
            threshold(b),
            band(0.0, a, palette::BAND_A),
            band(a, b, palette::BAND_B),
            band(b, 100.0, palette::BAND_C),
        ],
        annotations: vec![
            band_label(a / 2.0, "A"),
            band_label((a + b) / 2.0, "B"),
            band_label((b + 100.0) / 2.0, "C"),
        ],
        ..Default::default()
    }
}
