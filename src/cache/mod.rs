//! SQLite-based result cache with time-to-live.
//!
//! Memoizes warehouse result tables so that repeated renders with the same
//! filters reuse one snapshot. The cache is stored in
//! `~/.healthpanel/cache.db` unless a path is configured.
//!
//! # Design
//!
//! - Simple key-value store with JSON values and a store timestamp
//! - TTL is supplied by the reader, so page queries and option lists can
//!   share one store with different windows
//! - Expired entries are removed when read
//! - Versioned - auto-clears on version mismatch
//! - No single-flight: two cold misses for the same key both query the
//!   warehouse and the later write wins
//!
//! # Key Format
//!
//! ```text
//! {namespace}:{filter_fingerprint}:{query_hash}  -> ResultTable
//! options:{column}:{query_hash}                  -> ResultTable
//! ```

mod clock;
mod hash;
pub use clock::{Clock, ManualClock, SystemClock};
pub use hash::{compute_hash, hash_bytes};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::sql::BoundQuery;

/// Current cache schema version. Bump this when the cache format changes.
const CACHE_VERSION: i32 = 1;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine cache directory")]
    NoCacheDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache connection lock poisoned")]
    Poisoned,
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A value read back from the cache together with when it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

/// SQLite-based result cache.
pub struct ResultCache {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").finish_non_exhaustive()
    }
}

impl ResultCache {
    /// Open or create the cache database at `path`, or at the default
    /// location when `path` is `None`.
    ///
    /// If the cache version doesn't match, it's automatically cleared.
    pub fn open(path: Option<&Path>) -> CacheResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::cache_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!(path = %path.display(), "opening result cache");
        let conn = Connection::open(&path)?;
        Self::from_connection(conn, Arc::new(SystemClock))
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory() -> CacheResult<Self> {
        Self::open_in_memory_with_clock(Arc::new(SystemClock))
    }

    /// Open an in-memory cache driven by `clock`.
    pub fn open_in_memory_with_clock(clock: Arc<dyn Clock>) -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, clock)
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Get the path to the default cache database.
    pub fn cache_path() -> CacheResult<PathBuf> {
        let base = dirs::home_dir().ok_or(CacheError::NoCacheDir)?;
        Ok(base.join(".healthpanel").join("cache.db"))
    }

    fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> CacheResult<Self> {
        let cache = Self {
            conn: Mutex::new(conn),
            clock,
        };
        cache.init()?;
        Ok(cache)
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    /// Initialize the cache schema and check version.
    fn init(&self) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let stored_version: Option<i32> = conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == CACHE_VERSION => {}
            Some(v) => {
                tracing::info!(
                    found = v,
                    expected = CACHE_VERSION,
                    "cache version mismatch, clearing"
                );
                conn.execute("DELETE FROM entries", [])?;
                Self::set_version(&conn)?;
            }
            None => Self::set_version(&conn)?,
        }

        Ok(())
    }

    fn set_version(conn: &Connection) -> CacheResult<()> {
        conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![CACHE_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Get a value if it is younger than `ttl`.
    ///
    /// An entry whose age has reached `ttl` is deleted and reported as a miss.
    pub fn get<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
    ) -> CacheResult<Option<CacheEntry<T>>> {
        let conn = self.lock()?;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT value, stored_at FROM entries WHERE key = ?",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((json, stored_ms)) = row else {
            tracing::debug!(key, "cache miss");
            return Ok(None);
        };

        let now_ms = self.clock.now().timestamp_millis();
        let age_ms = now_ms.saturating_sub(stored_ms);
        if age_ms < 0 || age_ms as u128 >= ttl.as_millis() {
            conn.execute("DELETE FROM entries WHERE key = ?", params![key])?;
            tracing::debug!(key, age_ms, "cache entry expired");
            return Ok(None);
        }

        let stored_at = DateTime::from_timestamp_millis(stored_ms).unwrap_or_default();
        tracing::debug!(key, age_ms, "cache hit");
        Ok(Some(CacheEntry {
            value: serde_json::from_str(&json)?,
            stored_at,
        }))
    }

    /// Store a value, replacing any previous entry. Returns the store time.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> CacheResult<DateTime<Utc>> {
        let json = serde_json::to_string(value)?;
        let now = self.clock.now();
        self.lock()?.execute(
            "INSERT OR REPLACE INTO entries (key, value, stored_at) VALUES (?, ?, ?)",
            params![key, json, now.timestamp_millis()],
        )?;
        Ok(now)
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> CacheResult<bool> {
        let rows = self
            .lock()?
            .execute("DELETE FROM entries WHERE key = ?", params![key])?;
        Ok(rows > 0)
    }

    /// Remove every entry at least `ttl` old. Returns the number removed.
    pub fn purge_expired(&self, ttl: Duration) -> CacheResult<usize> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now().timestamp_millis().saturating_sub(ttl_ms);
        let rows = self
            .lock()?
            .execute("DELETE FROM entries WHERE stored_at <= ?", params![cutoff])?;
        tracing::info!(removed = rows, "purged expired cache entries");
        Ok(rows)
    }

    /// Clear all cache entries (but keep metadata). Returns the number removed.
    pub fn clear(&self) -> CacheResult<usize> {
        Ok(self.lock()?.execute("DELETE FROM entries", [])?)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheResult<CacheStats> {
        let conn = self.lock()?;
        let (entry_count, total_size, oldest, newest): (i64, i64, Option<i64>, Option<i64>) =
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(LENGTH(value)), 0), MIN(stored_at), MAX(stored_at) FROM entries",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;

        Ok(CacheStats {
            entry_count: entry_count as usize,
            total_size_bytes: total_size as usize,
            oldest: oldest.and_then(DateTime::from_timestamp_millis),
            newest: newest.and_then(DateTime::from_timestamp_millis),
        })
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Number of entries in the cache.
    pub entry_count: usize,
    /// Total size of all values in bytes.
    pub total_size_bytes: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}

/// Helper for generating cache keys.
pub struct CacheKey;

impl CacheKey {
    /// Key for a page query: namespace, filter fingerprint, and the hash of
    /// the SQL text plus its parameter values.
    pub fn query(
        namespace: &str,
        query: &BoundQuery,
        filter_fingerprint: &str,
    ) -> CacheResult<String> {
        Ok(format!(
            "{}:{}:{}",
            namespace,
            filter_fingerprint,
            compute_hash(query)?
        ))
    }

    /// Key for a filter option list.
    pub fn options(column: &str, query: &BoundQuery) -> CacheResult<String> {
        Ok(format!("options:{}:{}", column, compute_hash(query)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn manual_cache() -> (ResultCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let cache = ResultCache::open_in_memory_with_clock(clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn test_put_then_get_within_ttl() {
        let (cache, clock) = manual_cache();
        let stored_at = cache.put("k", &vec![1, 2, 3]).unwrap();

        clock.advance(Duration::from_secs(899));
        let hit: CacheEntry<Vec<i32>> = cache.get("k", Duration::from_secs(900)).unwrap().unwrap();
        assert_eq!(hit.value, vec![1, 2, 3]);
        assert_eq!(hit.stored_at, stored_at);
    }

    #[test]
    fn test_entry_expires_at_ttl() {
        let (cache, clock) = manual_cache();
        cache.put("k", &"v").unwrap();

        clock.advance(Duration::from_secs(900));
        let miss: Option<CacheEntry<String>> = cache.get("k", Duration::from_secs(900)).unwrap();
        assert!(miss.is_none());
        assert_eq!(cache.stats().unwrap().entry_count, 0);
    }

    #[test]
    fn test_ttl_is_per_reader() {
        let (cache, clock) = manual_cache();
        cache.put("k", &1).unwrap();
        clock.advance(Duration::from_secs(1000));

        let long: Option<CacheEntry<i32>> = cache.get("k", Duration::from_secs(1800)).unwrap();
        assert!(long.is_some());
    }

    #[test]
    fn test_purge_and_clear() {
        let (cache, clock) = manual_cache();
        cache.put("old", &1).unwrap();
        clock.advance(Duration::from_secs(600));
        cache.put("new", &2).unwrap();

        assert_eq!(cache.purge_expired(Duration::from_secs(300)).unwrap(), 1);
        assert_eq!(cache.stats().unwrap().entry_count, 1);
        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.stats().unwrap().entry_count, 0);
    }

    #[test]
    fn test_stats() {
        let (cache, _clock) = manual_cache();
        let empty = cache.stats().unwrap();
        assert_eq!(empty.entry_count, 0);
        assert!(empty.oldest.is_none());

        cache.put("a", &"x").unwrap();
        let stats = cache.stats().unwrap();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.total_size_bytes, 3); // "x" as JSON
        assert!(stats.newest.is_some());
    }

    #[test]
    fn test_on_disk_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.db");
        {
            let cache = ResultCache::open(Some(&path)).unwrap();
            cache.put("k", &42).unwrap();
        }
        let cache = ResultCache::open(Some(&path)).unwrap();
        let hit: Option<CacheEntry<i32>> = cache.get("k", Duration::from_secs(60)).unwrap();
        assert_eq!(hit.map(|e| e.value), Some(42));
    }

    #[test]
    fn test_query_key_changes_with_params() {
        use crate::sql::{Dialect, ParamValue, QueryParam};
        let q = |v: &str| BoundQuery {
            sql: "SELECT 1".into(),
            params: vec![QueryParam {
                name: "p0".into(),
                position: 1,
                value: ParamValue::String(v.into()),
            }],
            dialect: Dialect::BigQuery,
        };
        let a = CacheKey::query("page", &q("SP"), "fp").unwrap();
        let b = CacheKey::query("page", &q("RJ"), "fp").unwrap();
        assert!(a.starts_with("page:fp:"));
        assert_ne!(a, b);
    }
}
