//! BigQuery SQL dialect.
//!
//! BigQuery features used by the dashboard:
//! - Backtick quoting, with a fully qualified `project.dataset.table` path
//!   quoted as a single unit
//! - Named query parameters (`@name`)
//! - `INT64` and `SAFE_DIVIDE`

use super::helpers;
use super::SqlDialect;

/// BigQuery SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl SqlDialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn quote_table_path(&self, path: &str) -> String {
        helpers::quote_backtick(path)
    }

    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_backslash(s)
    }

    fn placeholder(&self, name: &str, _position: usize) -> String {
        helpers::placeholder_named(name)
    }

    fn int_type(&self) -> &'static str {
        "INT64"
    }

    fn supports_safe_divide(&self) -> bool {
        true
    }
}
