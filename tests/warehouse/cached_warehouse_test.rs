//! Tests for memoizing warehouse results.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use healthpanel::cache::{ManualClock, ResultCache};
use healthpanel::sql::{BoundQuery, Dialect};
use healthpanel::table::{ColumnSpec, DataType, ResultTable, Value};
use healthpanel::warehouse::{CachedWarehouse, MemoryWarehouse, Warehouse, WarehouseError};
use pretty_assertions::assert_eq;

const TTL: Duration = Duration::from_secs(900);
const OPTIONS_TTL: Duration = Duration::from_secs(3600);

fn bound(sql: &str) -> BoundQuery {
    BoundQuery {
        sql: sql.to_string(),
        params: Vec::new(),
        dialect: Dialect::BigQuery,
    }
}

fn per_year() -> ResultTable {
    ResultTable::new(
        vec![
            ColumnSpec::new("ano", DataType::Int),
            ColumnSpec::new("qtd", DataType::Int),
        ],
        vec![
            vec![Value::Int(2019), Value::Int(10)],
            vec![Value::Int(2020), Value::Null],
        ],
    )
    .unwrap()
}

fn setup(wh: MemoryWarehouse) -> (CachedWarehouse<MemoryWarehouse>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 10, 9, 0, 0).unwrap(),
    ));
    let cache = ResultCache::open_in_memory_with_clock(clock.clone()).unwrap();
    (
        CachedWarehouse::new(wh, Arc::new(cache), TTL, OPTIONS_TTL),
        clock,
    )
}

#[tokio::test]
async fn test_second_fetch_within_ttl_is_a_hit() {
    let (wh, clock) = setup(MemoryWarehouse::new().with_table("FROM t", per_year()));
    let q = bound("SELECT ano, qtd FROM t");

    let first = wh.fetch("per_year", &q, "abc").await.unwrap();
    assert!(!first.from_cache);

    clock.advance(Duration::from_secs(600));
    let second = wh.fetch("per_year", &q, "abc").await.unwrap();
    assert!(second.from_cache);
    assert_eq!(second.table, per_year());
    assert_eq!(second.fetched_at, first.fetched_at);
    assert_eq!(wh.inner().executions(), 1);
}

#[tokio::test]
async fn test_entry_expires_after_ttl() {
    let (wh, clock) = setup(MemoryWarehouse::new().with_table("FROM t", per_year()));
    let q = bound("SELECT ano, qtd FROM t");

    wh.fetch("per_year", &q, "abc").await.unwrap();
    clock.advance(TTL);
    let again = wh.fetch("per_year", &q, "abc").await.unwrap();
    assert!(!again.from_cache);
    assert_eq!(wh.inner().executions(), 2);
}

#[tokio::test]
async fn test_different_filters_do_not_share_entries() {
    let (wh, _clock) = setup(MemoryWarehouse::new().with_table("FROM t", per_year()));
    let q = bound("SELECT ano, qtd FROM t");

    wh.fetch("per_year", &q, "sul").await.unwrap();
    wh.fetch("per_year", &q, "norte").await.unwrap();
    wh.fetch("by_region", &q, "sul").await.unwrap();
    assert_eq!(wh.inner().executions(), 3);
    assert_eq!(wh.cache().unwrap().stats().unwrap().entry_count, 3);
}

#[tokio::test]
async fn test_options_outlive_page_queries() {
    let (wh, clock) = setup(MemoryWarehouse::new().with_table("AS valor", per_year()));
    let q = bound("SELECT DISTINCT uf AS valor FROM t");

    wh.fetch_options("uf", &q).await.unwrap();
    clock.advance(TTL + Duration::from_secs(60));
    let hit = wh.fetch_options("uf", &q).await.unwrap();
    assert!(hit.from_cache);
    assert_eq!(wh.inner().executions(), 1);
}

#[tokio::test]
async fn test_failures_propagate_and_are_not_cached() {
    let (wh, _clock) = setup(MemoryWarehouse::new().with_error(
        "FROM broken",
        "INVALID_QUERY",
        "Unrecognized name: ano",
    ));
    let q = bound("SELECT ano FROM broken");

    for _ in 0..2 {
        let err = wh.fetch("per_year", &q, "").await.unwrap_err();
        assert!(matches!(err, WarehouseError::Remote { .. }));
    }
    assert_eq!(wh.inner().executions(), 2);
    assert_eq!(wh.cache().unwrap().stats().unwrap().entry_count, 0);
}

#[tokio::test]
async fn test_uncached_wrapper_always_queries() {
    let wh = CachedWarehouse::uncached(MemoryWarehouse::new().with_fallback(per_year()));
    let q = bound("SELECT 1");
    wh.execute(&q).await.unwrap();
    wh.execute(&q).await.unwrap();
    assert!(wh.cache().is_none());
    assert_eq!(wh.inner().executions(), 2);
}
