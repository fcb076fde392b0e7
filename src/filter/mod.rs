//! Filter selections and their translation to SQL predicates.
//!
//! A page collects the user's choices into a [`FilterSelection`]: an
//! ordered list of restrictions on named columns plus constant base
//! predicates. The selection renders to a conjunctive WHERE clause in
//! which every user-chosen value is a bound parameter, never SQL text.
//!
//! ```text
//! "(Todos)"           -> Selection::All        -> no restriction
//! "SP"                -> Selection::Only("SP") -> `uf` = @p0
//! 2010..=2020, +NULL  -> YearRange             -> (`ano` BETWEEN @p1 AND @p2 OR `ano` IS NULL)
//! ```

mod predicate;
mod selection;

pub use predicate::{FilterField, FilterSelection, FilterValue, Match, NullPolicy};
pub use selection::{Selection, YearRange, ALL_SENTINELS};

/// Errors raised while building a filter predicate.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("non-finite value for filter '{field}'")]
    NonFinite { field: String },

    #[error("range for filter '{field}' is inverted and cannot be repaired: {start} > {end}")]
    InvertedRange { field: String, start: i64, end: i64 },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FilterResult<T> = Result<T, FilterError>;
