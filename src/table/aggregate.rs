//! Group-and-aggregate helpers.
//!
//! Groups keep the order in which their key first appears in the table;
//! callers sort afterwards when a chart needs ranking.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{cell, ResultTable, TableResult, Value};

/// Label used for rows whose group key is null.
pub const NOT_INFORMED: &str = "(não informado)";

/// How a group's value is computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum of a numeric column; unparsable cells count as zero.
    Sum(String),
    /// Number of distinct non-null values of a column.
    CountDistinct(String),
    /// Number of rows.
    Rows,
}

/// One group of a single-key aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: String,
    pub value: f64,
}

/// One cell of a two-key aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Group2 {
    pub row: String,
    pub col: String,
    pub value: f64,
}

fn key_label(v: &Value) -> String {
    v.as_label()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NOT_INFORMED.to_string())
}

enum Acc {
    Sum(f64),
    Distinct(HashSet<String>),
    Rows(usize),
}

impl Acc {
    fn new(agg: &Aggregation) -> Self {
        match agg {
            Aggregation::Sum(_) => Acc::Sum(0.0),
            Aggregation::CountDistinct(_) => Acc::Distinct(HashSet::new()),
            Aggregation::Rows => Acc::Rows(0),
        }
    }

    fn add(&mut self, cell: Option<&Value>) {
        match self {
            Acc::Sum(s) => {
                *s += cell
                    .and_then(Value::as_f64)
                    .filter(|f| f.is_finite())
                    .unwrap_or(0.0)
            }
            Acc::Distinct(set) => {
                if let Some(label) = cell.and_then(Value::as_label) {
                    set.insert(label);
                }
            }
            Acc::Rows(n) => *n += 1,
        }
    }

    fn value(&self) -> f64 {
        match self {
            Acc::Sum(s) => *s,
            Acc::Distinct(set) => set.len() as f64,
            Acc::Rows(n) => *n as f64,
        }
    }
}

fn measure_index(table: &ResultTable, agg: &Aggregation) -> TableResult<Option<usize>> {
    match agg {
        Aggregation::Sum(c) | Aggregation::CountDistinct(c) => {
            table.require_column(c).map(Some)
        }
        Aggregation::Rows => Ok(None),
    }
}

/// Group by one key column.
pub fn group_by(table: &ResultTable, key: &str, agg: &Aggregation) -> TableResult<Vec<Group>> {
    let key_idx = table.require_column(key)?;
    let measure = measure_index(table, agg)?;

    let mut order: Vec<String> = Vec::new();
    let mut accs: HashMap<String, Acc> = HashMap::new();
    for row in &table.rows {
        let label = key_label(cell(row, key_idx));
        let acc = accs.entry(label.clone()).or_insert_with(|| {
            order.push(label);
            Acc::new(agg)
        });
        acc.add(measure.map(|i| cell(row, i)));
    }

    Ok(order
        .into_iter()
        .map(|key| {
            let value = accs.get(&key).map_or(0.0, Acc::value);
            Group { key, value }
        })
        .collect())
}

/// Group by two key columns (heatmaps).
pub fn group_by2(
    table: &ResultTable,
    row_key: &str,
    col_key: &str,
    agg: &Aggregation,
) -> TableResult<Vec<Group2>> {
    let row_idx = table.require_column(row_key)?;
    let col_idx = table.require_column(col_key)?;
    let measure = measure_index(table, agg)?;

    let mut order: Vec<(String, String)> = Vec::new();
    let mut accs: HashMap<(String, String), Acc> = HashMap::new();
    for row in &table.rows {
        let key = (key_label(cell(row, row_idx)), key_label(cell(row, col_idx)));
        let acc = accs.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            Acc::new(agg)
        });
        acc.add(measure.map(|i| cell(row, i)));
    }

    Ok(order
        .into_iter()
        .map(|key| {
            let value = accs.get(&key).map_or(0.0, Acc::value);
            Group2 {
                row: key.0,
                col: key.1,
                value,
            }
        })
        .collect())
}

/// Sum of all group values.
pub fn total(groups: &[Group]) -> f64 {
    groups.iter().map(|g| g.value).sum()
}

/// Stable descending sort by value.
pub fn sort_desc(groups: &mut [Group]) {
    groups.sort_by(|a, b| b.value.total_cmp(&a.value));
}
