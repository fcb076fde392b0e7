//! Top-N horizontal bars per group.

use super::figure::{
    Axis, BarTrace, Color, Figure, Font, Layout, Margin, Marker, Series, Title,
};
use super::palette;
use super::ChartResult;
use crate::format;
use crate::table::{group_by, sort_desc, total, Aggregation, ResultTable};

#[derive(Debug, Clone, PartialEq)]
pub struct GroupBarOptions {
    pub group_col: String,
    pub value_col: String,
    pub title: String,
    pub top_n: usize,
    pub x_label: String,
    pub y_label: String,
    pub color: String,
    /// Pixels per bar; the chart grows with the number of groups.
    pub bar_height: u32,
}

impl Default for GroupBarOptions {
    fn default() -> Self {
        Self {
            group_col: String::new(),
            value_col: String::new(),
            title: String::new(),
            top_n: 10,
            x_label: "Quantidade".into(),
            y_label: String::new(),
            color: palette::PRIMARY.into(),
            bar_height: 38,
        }
    }
}

impl GroupBarOptions {
    pub fn new(group_col: &str, value_col: &str) -> Self {
        Self {
            group_col: group_col.into(),
            value_col: value_col.into(),
            y_label: group_col.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }

    pub fn labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }
}

/// Sum per group, keep the largest `top_n`, label each bar with its value
/// and its share of the grand total (all groups, not just the shown ones).
pub fn bar_total_by_group(table: &ResultTable, opts: &GroupBarOptions) -> ChartResult<Figure> {
    let mut groups = group_by(
        table,
        &opts.group_col,
        &Aggregation::Sum(opts.value_col.clone()),
    )?;
    if groups.is_empty() {
        return Ok(Figure::no_data(&opts.title));
    }

    let grand_total = total(&groups);
    sort_desc(&mut groups);
    groups.truncate(opts.top_n.max(1));

    let text = groups
        .iter()
        .map(|g| {
            let share = if grand_total > 0.0 {
                format!(" ({})", format::pct(g.value / grand_total * 100.0, 1))
            } else {
                String::new()
            };
            format!("{}{}", format::thousands_f64(g.value), share)
        })
        .collect();

    let max = groups.iter().map(|g| g.value).fold(0.0_f64, f64::max);
    let mut fig = Figure::new(&opts.title);
    fig.push(BarTrace {
        name: Some(opts.x_label.clone()),
        x: Series::numbers(groups.iter().map(|g| g.value)),
        y: Series::labels(groups.iter().map(|g| g.key.clone())),
        orientation: Some("h".into()),
        marker: Some(Marker {
            color: Some(Color::Single(opts.color.clone())),
            ..Default::default()
        }),
        text: Some(text),
        textposition: Some("outside".into()),
        hovertemplate: Some("<b>%{y}</b><br>%{x:,}<extra></extra>".into()),
        showlegend: Some(false),
    });
    fig.layout = Layout {
        title: Some(Title::centered(&opts.title)),
        height: Some(140 + opts.bar_height * groups.len() as u32),
        margin: Some(Margin::new(260, 60, 70, 50)),
        xaxis: Some(Axis {
            range: Some([0.0, if max > 0.0 { max * 1.25 } else { 1.0 }]),
            gridcolor: Some(palette::GRID.into()),
            ..Axis::titled(&opts.x_label)
        }),
        yaxis: Some(Axis {
            autorange: Some("reversed".into()),
            tickfont: Some(Font::sized(12)),
            ..Axis::titled(&opts.y_label)
        }),
        plot_bgcolor: Some(palette::BACKGROUND.into()),
        ..Default::default()
    };
    Ok(fig)
}
