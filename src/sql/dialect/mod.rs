//! SQL Dialect definitions and formatting rules.
//!
//! The dashboard targets a managed columnar warehouse (BigQuery) in
//! production; DuckDB and PostgreSQL are supported so the same page
//! queries can run against a local extract.
//!
//! | Concern | BigQuery | DuckDB | PostgreSQL |
//! |---------|----------|--------|------------|
//! | Identifier quoting | `` `x` `` | `"x"` | `"x"` |
//! | Table path | one backtick pair around `project.dataset.table` | quoted per segment | quoted per segment |
//! | Bound parameters | `@name` | `$n` | `$n` |
//! | 64-bit integer | `INT64` | `BIGINT` | `BIGINT` |
//! | Division by zero | `SAFE_DIVIDE` | `NULLIF` | `NULLIF` |

mod bigquery;
mod duckdb;
pub mod helpers;
mod postgres;

pub use bigquery::BigQuery;
pub use duckdb::DuckDb;
pub use postgres::Postgres;

use serde::{Deserialize, Serialize};

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    /// Quote an identifier (column, alias, CTE name).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a dotted table path.
    ///
    /// Default quotes each segment separately.
    fn quote_table_path(&self, path: &str) -> String {
        path.split('.')
            .map(|segment| self.quote_identifier(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    /// Placeholder for a bound parameter.
    ///
    /// `position` is 1-based and matches the order of
    /// [`BoundQuery::params`](crate::sql::BoundQuery::params).
    fn placeholder(&self, name: &str, position: usize) -> String;

    /// Name of the 64-bit integer type used in CAST.
    fn int_type(&self) -> &'static str {
        "BIGINT"
    }

    /// Whether `SAFE_DIVIDE(a, b)` is available.
    fn supports_safe_divide(&self) -> bool {
        false
    }
}

/// Supported warehouse dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    BigQuery,
    DuckDb,
    Postgres,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::BigQuery => &BigQuery,
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
        }
    }

    /// Parse a dialect name as used in configuration files.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "bigquery" | "bq" => Some(Dialect::BigQuery),
            "duckdb" | "duck" => Some(Dialect::DuckDb),
            "postgres" | "postgresql" | "pg" => Some(Dialect::Postgres),
            _ => None,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_table_path(&self, path: &str) -> String {
        self.dialect().quote_table_path(path)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_null(&self) -> &'static str {
        self.dialect().format_null()
    }

    fn placeholder(&self, name: &str, position: usize) -> String {
        self.dialect().placeholder(name, position)
    }

    fn int_type(&self) -> &'static str {
        self.dialect().int_type()
    }

    fn supports_safe_divide(&self) -> bool {
        self.dialect().supports_safe_divide()
    }
}
