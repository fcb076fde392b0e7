//! Dashboard pages.
//!
//! A page turns the user's filter choices into a list of [`Panel`]s. Each
//! panel answers one question with a chart, a row of metric tiles, or a
//! banner explaining why the visual was skipped.
//!
//! ```text
//! ResidencyFilters ─▶ FilterSelection ─▶ BoundQuery ─▶ CachedWarehouse
//!                                                           │
//!                 Vec<Panel> ◀── chart builders ◀── ResultTable
//! ```

pub mod assets;
pub mod residency;

pub use assets::{AssetDir, AssetLookup};
pub use residency::{BaselineCounts, FilterOptions, ResidencyFilters, ResidencyPage};

use serde::Serialize;

use crate::cache::CacheError;
use crate::chart::{ChartError, Figure};
use crate::config::SettingsError;
use crate::filter::FilterError;
use crate::geo::GeoError;
use crate::table::TableError;
use crate::warehouse::WarehouseError;

/// Errors raised while rendering a page.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("warehouse query failed: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("invalid filters: {0}")]
    Filter(#[from] FilterError),

    #[error("chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("boundary file error: {0}")]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

/// One metric tile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    /// Already formatted for display.
    pub value: String,
}

impl Metric {
    pub fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

/// What a panel shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum PanelContent {
    Chart(Figure),
    Metrics(Vec<Metric>),
    /// A visual was skipped; the text says why.
    Warning(String),
    Info(String),
}

/// One answered question on a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    /// Stable identifier, e.g. `certificates_by_uf`.
    pub id: String,
    pub question: String,
    pub content: PanelContent,
}

impl Panel {
    pub fn new(id: &str, question: &str, content: PanelContent) -> Self {
        Self {
            id: id.to_string(),
            question: question.to_string(),
            content,
        }
    }

    pub fn chart(id: &str, question: &str, figure: Figure) -> Self {
        Self::new(id, question, PanelContent::Chart(figure))
    }

    pub fn figure(&self) -> Option<&Figure> {
        match &self.content {
            PanelContent::Chart(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.content, PanelContent::Warning(_))
    }
}
