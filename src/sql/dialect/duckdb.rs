//! DuckDB SQL dialect.
//!
//! Used to run page queries against a local extract of the warehouse table.

use super::helpers;
use super::SqlDialect;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn placeholder(&self, _name: &str, position: usize) -> String {
        helpers::placeholder_positional(position)
    }
}
