//! In-memory warehouse with canned results.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::error::{WarehouseError, WarehouseResult};
use super::Warehouse;
use crate::sql::BoundQuery;
use crate::table::ResultTable;

enum Canned {
    Table(ResultTable),
    Error { code: String, message: String },
}

/// Answers queries from tables registered against SQL fragments.
///
/// The first route whose fragment occurs in the SQL text wins. Every
/// execution is counted and recorded, so tests can assert how often the
/// warehouse was actually hit.
#[derive(Default)]
pub struct MemoryWarehouse {
    routes: Vec<(String, Canned)>,
    fallback: Option<ResultTable>,
    executions: AtomicUsize,
    log: Mutex<Vec<BoundQuery>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `fragment` with `table`.
    pub fn with_table(mut self, fragment: &str, table: ResultTable) -> Self {
        self.routes.push((fragment.to_string(), Canned::Table(table)));
        self
    }

    /// Fail queries containing `fragment` with a remote error.
    pub fn with_error(mut self, fragment: &str, code: &str, message: &str) -> Self {
        self.routes.push((
            fragment.to_string(),
            Canned::Error {
                code: code.to_string(),
                message: message.to_string(),
            },
        ));
        self
    }

    /// Answer unmatched queries with `table` instead of failing.
    pub fn with_fallback(mut self, table: ResultTable) -> Self {
        self.fallback = Some(table);
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Every query executed so far, oldest first.
    pub async fn executed(&self) -> Vec<BoundQuery> {
        self.log.lock().await.clone()
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&self, query: &BoundQuery) -> WarehouseResult<ResultTable> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.log.lock().await.push(query.clone());

        let route = self
            .routes
            .iter()
            .find(|(fragment, _)| query.sql.contains(fragment.as_str()));
        match (route, &self.fallback) {
            (Some((_, Canned::Table(t))), _) => Ok(t.clone()),
            (Some((_, Canned::Error { code, message })), _) => {
                Err(WarehouseError::remote(code.clone(), message.clone()))
            }
            (None, Some(t)) => Ok(t.clone()),
            (None, None) => Err(WarehouseError::InvalidQuery(format!(
                "no canned result for query:\n{}",
                query.sql
            ))),
        }
    }
}
