//! SQL generation module.
//!
//! This module provides a type-safe SQL builder that generates multi-dialect SQL.
//! It includes:
//!
//! - [`query`] - SELECT query builder with CTEs and FULL OUTER JOIN
//! - [`expr`] - Expression AST and builder DSL
//! - [`param`] - Bound parameters; user values never become SQL text
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod param;
pub mod query;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    avg, case_when, case_when_else, cast_int, coalesce, col, count, count_distinct, count_if_distinct, count_star,
    func, lit_bool, lit_float, lit_int, lit_null, lit_str, lower, lower_trim, max, min,
    param, safe_divide, star, sum, table_col, trim, upper, BinaryOperator, Expr, ExprExt, Literal,
};
pub use param::{BoundQuery, ParamBinder, ParamValue, QueryParam};
pub use query::{Cte, Join, OrderByExpr, Query, SelectExpr, SortDir, TableRef, TableSource};
pub use token::{Token, TokenStream};
