//! Chart specification builders.
//!
//! Each builder is a pure function from a [`ResultTable`] and an options
//! struct to a [`Figure`]. An empty table yields [`Figure::no_data`] rather
//! than an error; the geographic builders additionally fail when a key
//! cannot be resolved against the boundary file.
//!
//! ```text
//! ResultTable ──group/aggregate──▶ series ──stats──▶ overlays ──▶ Figure (Plotly JSON)
//! ```
//!
//! [`ResultTable`]: crate::table::ResultTable

pub mod bar;
pub mod choropleth;
pub mod figure;
pub mod flow;
pub mod heatmap;
pub mod palette;
pub mod pareto;
pub mod pie;
pub mod trend;

pub use bar::{bar_total_by_group, GroupBarOptions};
pub use choropleth::{aggregate_states_to_regions, choropleth, ChoroplethOptions, GeoLevel};
pub use figure::{Figure, LegendPosition, Trace, NO_DATA_MESSAGE};
pub use flow::{entries_exits_by_year, FlowOptions};
pub use heatmap::{heatmap_absolute, heatmap_matrix, HeatmapMatrix, HeatmapOptions, PercentOf, Totals};
pub use pareto::{pareto_barh, CountMethod, ParetoOptions};
pub use pie::{pie_standard, PieOptions};
pub use trend::{bar_yoy_trend, GapFill, TrendOptions};

use crate::geo::GeoError;
use crate::table::TableError;

/// Errors raised while building a chart.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("invalid thresholds: expected 0 < A < B <= 100, got A={a}, B={b}")]
    InvalidThresholds { a: f64, b: f64 },

    #[error("invalid chart option: {0}")]
    InvalidOption(String),

    #[error(transparent)]
    Geo(#[from] GeoError),
}

pub type ChartResult<T> = Result<T, ChartError>;

/// Widest year span that gap filling will expand.
pub const MAX_FILLED_PERIODS: i64 = 200;

/// Whether `first..=last` is narrow enough to fill; logs when it is not.
pub(crate) fn fillable_span(first: i64, last: i64) -> bool {
    let span = last.saturating_sub(first).saturating_add(1);
    if span > MAX_FILLED_PERIODS {
        tracing::warn!(first, last, span, "year span too wide, skipping gap filling");
        return false;
    }
    true
}

/// Which chart a CLI or page asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Pareto,
    Trend,
    Pie,
    Bar,
    Heatmap,
    Flow,
    Choropleth,
}
