//! Two-key heatmaps with absolute values and percentage labels.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::figure::{Axis, ColorBar, Figure, HeatmapTrace, Layout, Margin, Title};
use super::palette;
use super::ChartResult;
use crate::format;
use crate::table::{group_by2, Aggregation, ResultTable};

/// Label of the appended total row and column.
pub const TOTAL_LABEL: &str = "Total";

/// What each cell's percentage is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentOf {
    Row,
    #[default]
    Col,
    Total,
    None,
}

/// Which margins get a "Total" line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Totals {
    #[default]
    None,
    /// A "Total" column holding each row's sum.
    Row,
    /// A "Total" row holding each column's sum.
    Col,
    Both,
}

impl Totals {
    fn row_totals(self) -> bool {
        matches!(self, Totals::Row | Totals::Both)
    }

    fn col_totals(self) -> bool {
        matches!(self, Totals::Col | Totals::Both)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapOptions {
    pub row_col: String,
    pub col_col: String,
    pub value_col: String,
    pub title: String,
    pub percent_of: PercentOf,
    pub totals: Totals,
    /// Zero cells are drawn empty instead of as the lowest colour.
    pub zero_as_blank: bool,
    pub decimals: usize,
    pub colorscale: String,
    pub colorbar_title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub height: Option<u32>,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            row_col: String::new(),
            col_col: String::new(),
            value_col: String::new(),
            title: String::new(),
            percent_of: PercentOf::Col,
            totals: Totals::None,
            zero_as_blank: true,
            decimals: 1,
            colorscale: "Blues".into(),
            colorbar_title: "Quantidade".into(),
            x_label: None,
            y_label: None,
            height: None,
        }
    }
}

impl HeatmapOptions {
    pub fn new(row_col: &str, col_col: &str, value_col: &str) -> Self {
        Self {
            row_col: row_col.into(),
            col_col: col_col.into(),
            value_col: value_col.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    pub fn percent_of(mut self, percent_of: PercentOf) -> Self {
        self.percent_of = percent_of;
        self
    }

    pub fn totals(mut self, totals: Totals) -> Self {
        self.totals = totals;
        self
    }

    pub fn zero_as_blank(mut self, blank: bool) -> Self {
        self.zero_as_blank = blank;
        self
    }

    pub fn decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }
}

/// The aggregated grid behind a heatmap, totals included.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapMatrix {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    /// `values[r][c]`; absent combinations are zero.
    pub values: Vec<Vec<f64>>,
    /// `None` where the reference total is zero or percentages are off.
    pub pct: Vec<Vec<Option<f64>>>,
}

impl HeatmapMatrix {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.cols.iter().position(|x| x == col)?;
        Some(self.values[r][c])
    }

    pub fn pct_at(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.rows.iter().position(|x| x == row)?;
        let c = self.cols.iter().position(|x| x == col)?;
        self.pct[r][c]
    }
}

/// Numeric keys ascend numerically ahead of text keys, which sort lexically.
fn axis_order(a: &String, b: &String) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

fn ratio(v: f64, of: f64) -> Option<f64> {
    (of != 0.0).then(|| v / of * 100.0)
}

/// Aggregate `value_col` over `(row_col, col_col)` and derive percentages.
///
/// Percentages are computed against the sums of the data cells, so a total
/// row under [`PercentOf::Col`] reads 100% and the grand-total corner takes
/// the grand total as both its row and column reference.
pub fn heatmap_matrix(table: &ResultTable, opts: &HeatmapOptions) -> ChartResult<HeatmapMatrix> {
    let cells = group_by2(
        table,
        &opts.row_col,
        &opts.col_col,
        &Aggregation::Sum(opts.value_col.clone()),
    )?;

    let mut rows: Vec<String> = Vec::new();
    let mut cols: Vec<String> = Vec::new();
    let mut lookup: HashMap<(String, String), f64> = HashMap::new();
    for cell in cells {
        if !rows.contains(&cell.row) {
            rows.push(cell.row.clone());
        }
        if !cols.contains(&cell.col) {
            cols.push(cell.col.clone());
        }
        *lookup.entry((cell.row, cell.col)).or_insert(0.0) += cell.value;
    }
    rows.sort_by(axis_order);
    cols.sort_by(axis_order);

    let mut values: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| {
            cols.iter()
                .map(|c| lookup.get(&(r.clone(), c.clone())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    let (n_rows, n_cols) = (rows.len(), cols.len());
    let row_sums: Vec<f64> = values.iter().map(|r| r.iter().sum()).collect();
    let col_sums: Vec<f64> = (0..n_cols)
        .map(|c| values.iter().map(|r| r[c]).sum())
        .collect();
    let grand: f64 = row_sums.iter().sum();

    if opts.totals.row_totals() {
        for (r, row) in values.iter_mut().enumerate() {
            row.push(row_sums[r]);
        }
        cols.push(TOTAL_LABEL.into());
    }
    if opts.totals.col_totals() {
        let mut total_row = col_sums.clone();
        if opts.totals.row_totals() {
            total_row.push(grand);
        }
        values.push(total_row);
        rows.push(TOTAL_LABEL.into());
    }

    let row_ref = |r: usize| if r < n_rows { row_sums[r] } else { grand };
    let col_ref = |c: usize| if c < n_cols { col_sums[c] } else { grand };
    let pct = values
        .iter()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, v)| match opts.percent_of {
                    PercentOf::Row => ratio(*v, row_ref(r)),
                    PercentOf::Col => ratio(*v, col_ref(c)),
                    PercentOf::Total => ratio(*v, grand),
                    PercentOf::None => None,
                })
                .collect()
        })
        .collect();

    Ok(HeatmapMatrix {
        rows,
        cols,
        values,
        pct,
    })
}

fn cell_text(value: f64, pct: Option<f64>, decimals: usize) -> String {
    let abs = format::thousands_f64(value);
    match pct {
        Some(p) => format!("{}<br>({})", abs, format::pct(p, decimals)),
        None => abs,
    }
}

pub fn heatmap_absolute(table: &ResultTable, opts: &HeatmapOptions) -> ChartResult<Figure> {
    let m = heatmap_matrix(table, opts)?;
    if m.is_empty() {
        return Ok(Figure::no_data(&opts.title));
    }

    let mut z = Vec::with_capacity(m.rows.len());
    let mut text = Vec::with_capacity(m.rows.len());
    for (vals, pcts) in m.values.iter().zip(&m.pct) {
        let mut z_row = Vec::with_capacity(vals.len());
        let mut t_row = Vec::with_capacity(vals.len());
        for (v, p) in vals.iter().zip(pcts) {
            if opts.zero_as_blank && *v == 0.0 {
                z_row.push(None);
                t_row.push(String::new());
            } else {
                z_row.push(Some(*v));
                t_row.push(cell_text(*v, *p, opts.decimals));
            }
        }
        z.push(z_row);
        text.push(t_row);
    }

    let height = opts
        .height
        .unwrap_or_else(|| (160 + 42 * m.rows.len() as u32).max(360));
    let mut fig = Figure::new(&opts.title);
    fig.push(HeatmapTrace {
        x: m.cols.clone(),
        y: m.rows.clone(),
        z,
        text,
        texttemplate: Some("%{text}".into()),
        colorscale: Some(opts.colorscale.clone()),
        colorbar: Some(ColorBar {
            title: Some(opts.colorbar_title.clone()),
            ..Default::default()
        }),
        hovertemplate: Some("<b>%{y}</b> · %{x}<br>%{text}<extra></extra>".into()),
        xgap: Some(1.0),
        ygap: Some(1.0),
    });
    fig.layout = Layout {
        title: Some(Title::centered(&opts.title)),
        height: Some(height),
        margin: Some(Margin::new(220, 40, 70, 50)),
        xaxis: Some(Axis {
            axis_type: Some("category".into()),
            ..Axis::titled(opts.x_label.as_deref().unwrap_or(&opts.col_col))
        }),
        yaxis: Some(Axis {
            axis_type: Some("category".into()),
            autorange: Some("reversed".into()),
            ..Axis::titled(opts.y_label.as_deref().unwrap_or(&opts.row_col))
        }),
        plot_bgcolor: Some(palette::BACKGROUND.into()),
        ..Default::default()
    };
    Ok(fig)
}
