//! Result tables.
//!
//! A [`ResultTable`] is the row set a warehouse returns for one query: named,
//! typed columns and rows of [`Value`]s. Chart builders read columns out of
//! it by name with the coercions the dashboards rely on.

pub mod aggregate;
pub mod export;

use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use aggregate::{
    group_by, group_by2, sort_desc, total, Aggregation, Group, Group2, NOT_INFORMED,
};
pub use export::CsvExport;

/// Errors raised while reading or reshaping a table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("column '{column}' not found (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid {data_type} value in column '{column}': {value}")]
    InvalidValue {
        column: String,
        data_type: DataType,
        value: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TableResult<T> = Result<T, TableError>;

/// Column data types as the warehouse reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Int,
    Float,
    Bool,
    Date,
}

impl DataType {
    /// Map a warehouse type name (`INT64`, `FLOAT64`, `NUMERIC`, ...).
    /// Unknown names read as strings.
    pub fn from_warehouse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "INT64" | "INTEGER" | "INT" | "BIGINT" | "SMALLINT" => DataType::Int,
            "FLOAT64" | "FLOAT" | "DOUBLE" | "REAL" | "NUMERIC" | "BIGNUMERIC" | "DECIMAL" => {
                DataType::Float
            }
            "BOOL" | "BOOLEAN" => DataType::Bool,
            "DATE" => DataType::Date,
            _ => DataType::String,
        }
    }

    /// Warehouse-style type name, used by the schema dictionary export.
    pub fn warehouse_name(&self) -> &'static str {
        match self {
            DataType::String => "STRING",
            DataType::Int => "INT64",
            DataType::Float => "FLOAT64",
            DataType::Bool => "BOOL",
            DataType::Date => "DATE",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.warehouse_name())
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "lowercase")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view. Strings are parsed after trimming; dates and
    /// unparsable strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Null | Value::Date(_) => None,
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Integer view. Floats only convert when integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Value::Bool(b) => Some(*b as i64),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(|f| Value::Float(f).as_i64()))
            }
            _ => None,
        }
    }

    /// Display text, `None` for nulls.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnSpec {
    pub fn new(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
        }
    }
}

/// Column metadata in the bridge wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireColumn {
    pub name: String,
    pub data_type: String,
}

static NULL: Value = Value::Null;

/// Cell `idx` of `row`; short rows read as null.
pub fn cell(row: &[Value], idx: usize) -> &Value {
    row.get(idx).unwrap_or(&NULL)
}

/// Rows returned by one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    /// Build a table, checking every row has one value per column.
    pub fn new(columns: Vec<ColumnSpec>, rows: Vec<Vec<Value>>) -> TableResult<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RowWidth {
                    row: i,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// A table with the given columns and no rows.
    pub fn empty(columns: Vec<ColumnSpec>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of `name`, or an error listing the available columns.
    pub fn require_column(&self, name: &str) -> TableResult<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::MissingColumn {
                column: name.to_string(),
                available: self.column_names().join(", "),
            })
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> TableResult<()> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cells of one column.
    pub fn column(&self, name: &str) -> TableResult<impl Iterator<Item = &Value>> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |r| cell(r, idx)))
    }

    /// Text labels; nulls are `None`.
    pub fn text(&self, name: &str) -> TableResult<Vec<Option<String>>> {
        Ok(self.column(name)?.map(Value::as_label).collect())
    }

    /// Numbers with unparsable and missing cells read as zero.
    pub fn numeric(&self, name: &str) -> TableResult<Vec<f64>> {
        Ok(self
            .column(name)?
            .map(|v| v.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0))
            .collect())
    }

    /// Numbers with missing cells kept as `None`.
    pub fn optional_numeric(&self, name: &str) -> TableResult<Vec<Option<f64>>> {
        Ok(self
            .column(name)?
            .map(|v| v.as_f64().filter(|f| f.is_finite()))
            .collect())
    }

    pub fn int(&self, name: &str) -> TableResult<Vec<Option<i64>>> {
        Ok(self.column(name)?.map(Value::as_i64).collect())
    }

    /// Keep only the rows matching `pred`.
    pub fn filter_rows(&self, mut pred: impl FnMut(&[Value]) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| pred(r)).cloned().collect(),
        }
    }

    /// Build from the bridge's JSON rows, parsing each cell per its
    /// column type. Integer columns arrive as JSON strings from some
    /// warehouses and are parsed here.
    pub fn from_wire(
        columns: Vec<WireColumn>,
        rows: Vec<Vec<serde_json::Value>>,
    ) -> TableResult<Self> {
        let specs: Vec<ColumnSpec> = columns
            .iter()
            .map(|c| ColumnSpec::new(&c.name, DataType::from_warehouse(&c.data_type)))
            .collect();

        let mut typed = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != specs.len() {
                return Err(TableError::RowWidth {
                    row: i,
                    expected: specs.len(),
                    found: row.len(),
                });
            }
            let values = row
                .into_iter()
                .zip(&specs)
                .map(|(cell, spec)| wire_value(cell, spec))
                .collect::<TableResult<Vec<_>>>()?;
            typed.push(values);
        }
        Ok(Self {
            columns: specs,
            rows: typed,
        })
    }

    /// Read a CSV with a header row. Column types are inferred: a column
    /// whose non-empty cells all parse as integers is `Int`, then `Float`,
    /// otherwise `String`. Empty cells are nulls.
    pub fn from_csv_reader<R: Read>(reader: R) -> TableResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();

        let mut raw: Vec<Vec<String>> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            raw.push(record.iter().map(String::from).collect());
        }

        let types: Vec<DataType> = (0..headers.len())
            .map(|c| infer_type(raw.iter().filter_map(|r| r.get(c).map(String::as_str))))
            .collect();

        let rows = raw
            .into_iter()
            .map(|r| {
                r.into_iter()
                    .zip(&types)
                    .map(|(cell, ty)| parse_cell(&cell, *ty))
                    .collect()
            })
            .collect();

        let columns = headers
            .iter()
            .zip(types)
            .map(|(h, t)| ColumnSpec::new(h, t))
            .collect();
        Self::new(columns, rows)
    }
}

fn wire_value(cell: serde_json::Value, spec: &ColumnSpec) -> TableResult<Value> {
    use serde_json::Value as J;

    let invalid = |v: &J| TableError::InvalidValue {
        column: spec.name.clone(),
        data_type: spec.data_type,
        value: v.to_string(),
    };

    Ok(match (&cell, spec.data_type) {
        (J::Null, _) => Value::Null,
        (J::Number(n), DataType::Int) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => return Err(invalid(&cell)),
        },
        (J::String(s), DataType::Int) => {
            Value::Int(s.trim().parse().map_err(|_| invalid(&cell))?)
        }
        (J::Number(n), DataType::Float) => Value::Float(n.as_f64().ok_or_else(|| invalid(&cell))?),
        (J::String(s), DataType::Float) => {
            Value::Float(s.trim().parse().map_err(|_| invalid(&cell))?)
        }
        (J::Bool(b), DataType::Bool) => Value::Bool(*b),
        (J::String(s), DataType::Bool) => match s.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(invalid(&cell)),
        },
        (J::String(s), DataType::Date) => Value::Date(
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid(&cell))?,
        ),
        (J::String(s), DataType::String) => Value::String(s.clone()),
        (other, DataType::String) => Value::String(other.to_string()),
        (other, _) => return Err(invalid(other)),
    })
}

fn infer_type<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> DataType {
    let mut non_empty = cells.filter(|c| !c.is_empty()).peekable();
    if non_empty.peek().is_none() {
        return DataType::String;
    }
    let all = |f: fn(&str) -> bool| non_empty.clone().all(f);
    if all(|c: &str| c.parse::<i64>().is_ok()) {
        DataType::Int
    } else if all(|c: &str| c.parse::<f64>().is_ok()) {
        DataType::Float
    } else {
        DataType::String
    }
}

fn parse_cell(cell: &str, ty: DataType) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    match ty {
        DataType::Int => cell.parse().map(Value::Int).unwrap_or(Value::Null),
        DataType::Float => cell.parse().map(Value::Float).unwrap_or(Value::Null),
        _ => Value::String(cell.to_string()),
    }
}
