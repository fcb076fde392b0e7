//! Shared helper functions for SQL dialect implementations.

/// Quote identifier with double quotes (ANSI style).
/// Used by: Postgres, DuckDB
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote identifier with backticks, escaping embedded backticks.
/// Used by: BigQuery
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Quote string with single quotes (standard SQL).
/// Used by: Postgres, DuckDB
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Quote string with single quotes and backslash escapes.
/// Used by: BigQuery
pub fn quote_string_backslash(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// `$n` positional placeholder.
/// Used by: Postgres, DuckDB
pub fn placeholder_positional(position: usize) -> String {
    format!("${}", position)
}

/// `@name` named placeholder.
/// Used by: BigQuery
pub fn placeholder_named(name: &str) -> String {
    format!("@{}", name)
}
