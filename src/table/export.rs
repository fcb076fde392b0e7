//! CSV export of result tables.

use chrono::NaiveDate;

use super::{ResultTable, TableError, TableResult};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A downloadable CSV document.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    /// `{stem}_{YYYY-MM-DD}.csv`
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CsvExport {
    /// Serialize `table` with a header row.
    pub fn from_table(table: &ResultTable, stem: &str, date: NaiveDate) -> TableResult<Self> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(table.column_names())?;
        for row in &table.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        Ok(Self {
            filename: filename(stem, date),
            content_type: CSV_CONTENT_TYPE,
            bytes: finish(wtr)?,
        })
    }

    /// Column dictionary of `table`: one `column,type,mode` line per column.
    pub fn schema_dictionary(table: &ResultTable, stem: &str, date: NaiveDate) -> TableResult<Self> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(["column", "type", "mode"])?;
        for c in &table.columns {
            wtr.write_record([c.name.as_str(), c.data_type.warehouse_name(), "NULLABLE"])?;
        }
        Ok(Self {
            filename: filename(&format!("{}_dicionario", stem), date),
            content_type: CSV_CONTENT_TYPE,
            bytes: finish(wtr)?,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

fn filename(stem: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", stem, date.format("%Y-%m-%d"))
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> TableResult<Vec<u8>> {
    wtr.into_inner()
        .map_err(|e| TableError::Io(e.into_error()))
}
