//! Warehouse wrapper that memoizes results for a time window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::WarehouseResult;
use super::Warehouse;
use crate::cache::{CacheKey, CacheResult, ResultCache};
use crate::sql::BoundQuery;
use crate::table::ResultTable;

/// A result table and the moment it was fetched from the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub table: ResultTable,
    pub fetched_at: DateTime<Utc>,
    /// Whether this call was answered from the cache.
    #[serde(skip)]
    pub from_cache: bool,
}

/// Wraps a warehouse with a [`ResultCache`].
///
/// Identical queries within the TTL return the same snapshot without
/// touching the warehouse. Warehouse failures propagate unchanged and are
/// never cached. Cache failures are logged and the query runs uncached.
/// There is no single-flight: concurrent cold misses each query.
pub struct CachedWarehouse<W> {
    inner: W,
    cache: Option<Arc<ResultCache>>,
    ttl: Duration,
    options_ttl: Duration,
}

impl<W: Warehouse> CachedWarehouse<W> {
    pub fn new(inner: W, cache: Arc<ResultCache>, ttl: Duration, options_ttl: Duration) -> Self {
        Self {
            inner,
            cache: Some(cache),
            ttl,
            options_ttl,
        }
    }

    /// Pass every query through.
    pub fn uncached(inner: W) -> Self {
        Self {
            inner,
            cache: None,
            ttl: Duration::ZERO,
            options_ttl: Duration::ZERO,
        }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_deref()
    }

    /// A page query, keyed by namespace and filter fingerprint.
    pub async fn fetch(
        &self,
        namespace: &str,
        query: &BoundQuery,
        filter_fingerprint: &str,
    ) -> WarehouseResult<Snapshot> {
        let key = CacheKey::query(namespace, query, filter_fingerprint);
        self.fetch_keyed(key, query, self.ttl).await
    }

    /// A filter option list, cached for the longer options window.
    pub async fn fetch_options(&self, column: &str, query: &BoundQuery) -> WarehouseResult<Snapshot> {
        let key = CacheKey::options(column, query);
        self.fetch_keyed(key, query, self.options_ttl).await
    }

    async fn fetch_keyed(
        &self,
        key: CacheResult<String>,
        query: &BoundQuery,
        ttl: Duration,
    ) -> WarehouseResult<Snapshot> {
        let cache = match (&self.cache, key) {
            (Some(cache), Ok(key)) => Some((cache, key)),
            (Some(_), Err(e)) => {
                tracing::warn!(error = %e, "could not build cache key, querying uncached");
                None
            }
            (None, _) => None,
        };

        if let Some((cache, key)) = &cache {
            match cache.get::<ResultTable>(key, ttl) {
                Ok(Some(entry)) => {
                    return Ok(Snapshot {
                        table: entry.value,
                        fetched_at: entry.stored_at,
                        from_cache: true,
                    })
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, key = %key, "cache read failed"),
            }
        }

        let table = self.inner.execute(query).await?;
        let fetched_at = match &cache {
            Some((cache, key)) => match cache.put(key, &table) {
                Ok(at) => at,
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "cache write failed");
                    Utc::now()
                }
            },
            None => Utc::now(),
        };
        Ok(Snapshot {
            table,
            fetched_at,
            from_cache: false,
        })
    }
}

#[async_trait]
impl<W: Warehouse> Warehouse for CachedWarehouse<W> {
    async fn execute(&self, query: &BoundQuery) -> WarehouseResult<ResultTable> {
        Ok(self.fetch("query", query, "").await?.table)
    }
}
