//! # Healthpanel
//!
//! Query building, result caching and chart specifications for public-health
//! dashboards backed by a cloud warehouse.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Widget choices (ResidencyFilters)           │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [filter]
//! ┌─────────────────────────────────────────────────────────┐
//! │      FilterSelection: predicates with bound parameters   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 BoundQuery (SQL + params)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [warehouse + cache]
//! ┌─────────────────────────────────────────────────────────┐
//! │                       ResultTable                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [chart + stats + geo]
//! ┌─────────────────────────────────────────────────────────┐
//! │               Figure (Plotly JSON) per panel             │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod format;
pub mod geo;
pub mod sql;
pub mod stats;
pub mod table;
pub mod warehouse;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::cache::{CacheKey, ResultCache};
    pub use crate::chart::{ChartError, ChartKind, Figure};
    pub use crate::config::Settings;
    pub use crate::dashboard::{Panel, PanelContent, ResidencyFilters, ResidencyPage};
    pub use crate::filter::{FilterField, FilterSelection, FilterValue, Selection, YearRange};
    pub use crate::sql::{
        col, count_distinct, lit_int, lit_str, BoundQuery, Dialect, Expr, ExprExt, ParamBinder,
        Query, TableRef,
    };
    pub use crate::table::{ColumnSpec, DataType, ResultTable, Value};
    pub use crate::warehouse::{CachedWarehouse, Warehouse};
}

pub use sql::Dialect;
