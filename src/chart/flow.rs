//! Entries versus exits per year, as bilateral bars.

use std::collections::BTreeMap;

use super::figure::{
    Axis, BarTrace, Color, Figure, Layout, LegendPosition, Line, Marker, ScatterTrace, Series,
    Title,
};
use super::palette;
use super::{fillable_span, ChartResult};
use crate::format;
use crate::table::ResultTable;

#[derive(Debug, Clone, PartialEq)]
pub struct FlowOptions {
    pub year_col: String,
    pub entries_col: String,
    pub exits_col: String,
    pub title: String,
    pub entries_label: String,
    pub exits_label: String,
    pub entries_color: String,
    pub exits_color: String,
    /// Overlay entries minus exits as a line.
    pub show_net: bool,
    /// Years between the first and last observed year get zero bars.
    pub fill_missing_years: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            year_col: "ano".into(),
            entries_col: "entradas".into(),
            exits_col: "saidas".into(),
            title: String::new(),
            entries_label: "Entradas".into(),
            exits_label: "Saídas".into(),
            entries_color: palette::PRIMARY.into(),
            exits_color: palette::SECONDARY.into(),
            show_net: false,
            fill_missing_years: true,
            width: Some(1100),
            height: Some(560),
        }
    }
}

impl FlowOptions {
    pub fn new(year_col: &str, entries_col: &str, exits_col: &str) -> Self {
        Self {
            year_col: year_col.into(),
            entries_col: entries_col.into(),
            exits_col: exits_col.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn show_net(mut self, show: bool) -> Self {
        self.show_net = show;
        self
    }
}

/// One year of the flow series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowPoint {
    pub year: i64,
    pub entries: f64,
    pub exits: f64,
}

impl FlowPoint {
    pub fn net(&self) -> f64 {
        self.entries - self.exits
    }
}

/// Sum entries and exits per year; rows without a year are dropped.
pub fn flow_series(table: &ResultTable, opts: &FlowOptions) -> ChartResult<Vec<FlowPoint>> {
    let years = table.int(&opts.year_col)?;
    let entries = table.numeric(&opts.entries_col)?;
    let exits = table.numeric(&opts.exits_col)?;

    let mut by_year: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
    for ((year, e), s) in years.into_iter().zip(entries).zip(exits) {
        if let Some(y) = year {
            let slot = by_year.entry(y).or_insert((0.0, 0.0));
            slot.0 += e;
            slot.1 += s;
        }
    }

    let bounds = by_year
        .keys()
        .next()
        .copied()
        .zip(by_year.keys().next_back().copied());
    let fill = opts.fill_missing_years
        && bounds.is_some_and(|(first, last)| fillable_span(first, last));
    let points: Vec<FlowPoint> = match bounds {
        Some((first, last)) if fill => (first..=last)
            .map(|year| {
                let (entries, exits) = by_year.get(&year).copied().unwrap_or((0.0, 0.0));
                FlowPoint {
                    year,
                    entries,
                    exits,
                }
            })
            .collect(),
        _ => by_year
            .into_iter()
            .map(|(year, (entries, exits))| FlowPoint {
                year,
                entries,
                exits,
            })
            .collect(),
    };
    Ok(points)
}

/// Entries above the axis, exits mirrored below it, stacked relative.
pub fn entries_exits_by_year(table: &ResultTable, opts: &FlowOptions) -> ChartResult<Figure> {
    let points = flow_series(table, opts)?;
    if points.iter().all(|p| p.entries == 0.0 && p.exits == 0.0) {
        return Ok(Figure::no_data(&opts.title));
    }

    let x = Series::numbers(points.iter().map(|p| p.year as f64));
    let bars = |label: &str, color: &str, values: Vec<f64>, shown: Vec<f64>| BarTrace {
        name: Some(label.into()),
        x: x.clone(),
        y: Series::numbers(values),
        marker: Some(Marker {
            color: Some(Color::Single(color.into())),
            ..Default::default()
        }),
        text: Some(shown.into_iter().map(format::thousands_f64).collect()),
        textposition: Some("outside".into()),
        hovertemplate: Some(format!("<b>%{{x}}</b><br>{}: %{{text}}<extra></extra>", label)),
        ..Default::default()
    };

    let mut fig = Figure::new(&opts.title);
    fig.push(bars(
        &opts.entries_label,
        &opts.entries_color,
        points.iter().map(|p| p.entries).collect(),
        points.iter().map(|p| p.entries).collect(),
    ));
    fig.push(bars(
        &opts.exits_label,
        &opts.exits_color,
        points.iter().map(|p| -p.exits).collect(),
        points.iter().map(|p| p.exits).collect(),
    ));
    if opts.show_net {
        fig.push(ScatterTrace {
            name: Some("Saldo".into()),
            x: x.clone(),
            y: Series::numbers(points.iter().map(FlowPoint::net)),
            mode: "lines+markers".into(),
            line: Some(Line::solid(palette::NET_LINE, 2.0)),
            ..Default::default()
        });
    }

    let peak = points
        .iter()
        .map(|p| p.entries.max(p.exits))
        .fold(0.0_f64, f64::max);
    let limit = if peak > 0.0 { peak * 1.2 } else { 1.0 };
    fig.layout = Layout {
        title: Some(Title::centered(&opts.title)),
        width: opts.width,
        height: opts.height,
        barmode: Some("relative".into()),
        xaxis: Some(Axis::years("Ano")),
        yaxis: Some(Axis {
            range: Some([-limit, limit]),
            zeroline: Some(true),
            gridcolor: Some(palette::GRID.into()),
            ..Axis::titled("Quantidade")
        }),
        legend: Some(LegendPosition::Top.legend()),
        plot_bgcolor: Some(palette::BACKGROUND.into()),
        ..Default::default()
    };
    Ok(fig)
}
