//! Pie and donut charts.

use super::figure::{Figure, Layout, LegendPosition, Marker, PieTrace, Title};
use super::palette;
use super::{ChartError, ChartResult};
use crate::table::{group_by, sort_desc, Aggregation, Group, ResultTable};

/// Label of the slice that collects everything past `top_n`.
pub const OTHERS_LABEL: &str = "Outros";

#[derive(Debug, Clone, PartialEq)]
pub struct PieOptions {
    pub names_col: String,
    pub values_col: String,
    pub title: String,
    /// Keep the largest `top_n` slices and fold the rest into "Outros".
    pub top_n: Option<usize>,
    /// Donut hole as a fraction of the radius; `0.0` draws a full pie.
    pub hole: f64,
    /// Slice colours by label; unmapped labels cycle through the categorical palette.
    pub color_map: Vec<(String, String)>,
    pub legend: LegendPosition,
    pub height: Option<u32>,
}

impl Default for PieOptions {
    fn default() -> Self {
        Self {
            names_col: String::new(),
            values_col: String::new(),
            title: String::new(),
            top_n: None,
            hole: 0.45,
            color_map: Vec::new(),
            legend: LegendPosition::Right,
            height: None,
        }
    }
}

impl PieOptions {
    pub fn new(names_col: &str, values_col: &str) -> Self {
        Self {
            names_col: names_col.into(),
            values_col: values_col.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn top_n(mut self, n: usize) -> Self {
        self.top_n = Some(n);
        self
    }

    pub fn hole(mut self, hole: f64) -> Self {
        self.hole = hole;
        self
    }

    pub fn legend(mut self, legend: LegendPosition) -> Self {
        self.legend = legend;
        self
    }

    pub fn color_map<'a>(mut self, map: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.color_map = map
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    fn color_for(&self, label: &str, i: usize) -> String {
        if label == OTHERS_LABEL {
            return palette::OTHERS.to_string();
        }
        self.color_map
            .iter()
            .find(|(k, _)| k == label)
            .map(|(_, c)| c.clone())
            .unwrap_or_else(|| palette::categorical(i).to_string())
    }
}

/// Sort descending and collapse everything past `top_n` into one slice.
pub fn top_n_with_others(mut groups: Vec<Group>, top_n: Option<usize>) -> Vec<Group> {
    sort_desc(&mut groups);
    let Some(n) = top_n else {
        return groups;
    };
    if groups.len() <= n {
        return groups;
    }
    let rest: f64 = groups[n..].iter().map(|g| g.value).sum();
    groups.truncate(n);
    if rest > 0.0 {
        groups.push(Group {
            key: OTHERS_LABEL.into(),
            value: rest,
        });
    }
    groups
}

pub fn pie_standard(table: &ResultTable, opts: &PieOptions) -> ChartResult<Figure> {
    if !(0.0..1.0).contains(&opts.hole) {
        return Err(ChartError::InvalidOption(format!(
            "pie hole must be in [0, 1), got {}",
            opts.hole
        )));
    }
    let groups = group_by(
        table,
        &opts.names_col,
        &Aggregation::Sum(opts.values_col.clone()),
    )?;
    let groups: Vec<Group> = groups.into_iter().filter(|g| g.value > 0.0).collect();
    if groups.is_empty() {
        return Ok(Figure::no_data(&opts.title));
    }

    let slices = top_n_with_others(groups, opts.top_n);
    let colors = slices
        .iter()
        .enumerate()
        .map(|(i, g)| opts.color_for(&g.key, i))
        .collect();

    let mut fig = Figure::new(&opts.title);
    fig.push(PieTrace {
        labels: slices.iter().map(|g| g.key.clone()).collect(),
        values: slices.iter().map(|g| g.value).collect(),
        hole: (opts.hole > 0.0).then_some(opts.hole),
        marker: Some(Marker {
            colors: Some(colors),
            ..Default::default()
        }),
        textinfo: Some("percent".into()),
        sort: Some(false),
        hovertemplate: Some("<b>%{label}</b><br>%{value:,} (%{percent})<extra></extra>".into()),
    });
    fig.layout = Layout {
        title: Some(Title::centered(&opts.title)),
        height: opts.height,
        legend: Some(opts.legend.legend()),
        ..Default::default()
    };
    Ok(fig)
}
