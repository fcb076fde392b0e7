//! Query execution.
//!
//! Pages never talk to the cloud warehouse directly. They hand a
//! [`BoundQuery`] to something implementing [`Warehouse`]:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Page render (Tokio)                      │
//! │                                                              │
//! │   CachedWarehouse<W> ── hit ──▶ ResultCache (SQLite, TTL)    │
//! │          │ miss                                              │
//! │          ▼                                                   │
//! │   BridgeWarehouse                    MemoryWarehouse         │
//! │   - spawns the bridge executable     - canned tables for     │
//! │   - NDJSON over stdin/stdout           tests and demos       │
//! │   - request ids, per-query timeout                           │
//! └──────────┼───────────────────────────────────────────────────┘
//!            │ stdin (NDJSON) / stdout (NDJSON)
//!            ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │     Bridge process (holds the warehouse client + key file)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no retry or circuit breaking: a failed query surfaces as a
//! [`WarehouseError`] to the caller.

mod bridge;
mod cached;
mod error;
mod memory;
pub mod protocol;

pub use bridge::{BridgeTarget, BridgeWarehouse};
pub use cached::{CachedWarehouse, Snapshot};
pub use error::{WarehouseError, WarehouseResult};
pub use memory::MemoryWarehouse;

use async_trait::async_trait;

use crate::sql::BoundQuery;
use crate::table::ResultTable;

/// Anything that can run a bound query and return its rows.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn execute(&self, query: &BoundQuery) -> WarehouseResult<ResultTable>;
}

#[async_trait]
impl<W: Warehouse + ?Sized> Warehouse for std::sync::Arc<W> {
    async fn execute(&self, query: &BoundQuery) -> WarehouseResult<ResultTable> {
        (**self).execute(query).await
    }
}
