//! Tests for invalidation after INSERT / UPDATE / DELETE
//!
//! Writes run first; only a successful write evicts anything.

#[path = "testutils/mod.rs"]
mod testutils;

use querycache::{CacheEvent, ExecutorError, QueryArgs, QueryOutput, Value};
use serde_json::json;
use testutils::fixture::CacheFixture;
use testutils::recording::{row, Response};

const USER_BY_ID: &str = "SELECT * FROM {T} WHERE id = :id";
const ALL_USERS: &str = "SELECT * FROM {T}";
const UPDATE_BY_ID: &str = "UPDATE {T} SET x = :x WHERE id = :id";
const KV_BIN: &str = "query_cache_T_kv";
const GENERAL_BIN: &str = "query_cache_T";

fn key_value_fixture() -> CacheFixture {
    let fixture = CacheFixture::new(json!({
        "T": {
            "primary_key": ["id"],
            "key_value": { "key_columns": ["id"], "query": USER_BY_ID },
            "cache_all_queries": true
        }
    }));
    fixture.executor.respond_rows(
        USER_BY_ID,
        vec![row([("id", Value::from(5i64)), ("x", Value::from(0i64))])],
    );
    fixture
}

fn by_id(id: i64) -> QueryArgs {
    QueryArgs::named([("id", id)])
}

fn update_args(id: i64) -> QueryArgs {
    QueryArgs::named([("x", 1i64), ("id", id)])
}

#[test]
fn test_update_evicts_point_entry_and_general_pool() {
    let fixture = key_value_fixture();

    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(ALL_USERS, QueryArgs::new());
    assert_eq!(fixture.keys(KV_BIN), vec!["kv:id=5".to_string()]);
    assert_eq!(fixture.keys(GENERAL_BIN).len(), 1);

    fixture.query(UPDATE_BY_ID, update_args(5));
    assert!(fixture.keys(KV_BIN).is_empty());
    assert!(fixture.keys(GENERAL_BIN).is_empty());
    assert_eq!(
        fixture.observer.count(|e| matches!(
            e,
            CacheEvent::KeyInvalidated { bin, key } if bin == KV_BIN && key == "kv:id=5"
        )),
        1
    );

    fixture.query(USER_BY_ID, by_id(5));
    assert_eq!(fixture.executor.calls_for(USER_BY_ID), 2);
}

#[test]
fn test_update_evicts_point_reads_cached_under_general_key() {
    let fixture = CacheFixture::new(json!({
        "T": { "primary_key": ["id"], "key_value": { "key_columns": ["id"] } }
    }));

    fixture.query(USER_BY_ID, by_id(5));
    assert!(fixture.keys(KV_BIN).is_empty());
    assert_eq!(fixture.keys(GENERAL_BIN).len(), 1);

    fixture.query(UPDATE_BY_ID, update_args(5));
    assert!(fixture.keys(GENERAL_BIN).is_empty());

    fixture.query(USER_BY_ID, by_id(5));
    assert_eq!(fixture.executor.calls_for(USER_BY_ID), 2);
}

#[test]
fn test_update_keeps_other_point_entries() {
    let fixture = key_value_fixture();

    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(USER_BY_ID, by_id(6));
    fixture.query(UPDATE_BY_ID, update_args(5));

    assert_eq!(fixture.keys(KV_BIN), vec!["kv:id=6".to_string()]);
}

#[test]
fn test_invalidation_is_idempotent() {
    let fixture = key_value_fixture();

    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(USER_BY_ID, by_id(6));
    fixture.query(ALL_USERS, QueryArgs::new());

    fixture.query(UPDATE_BY_ID, update_args(5));
    let kv_once = fixture.keys(KV_BIN);
    let general_once = fixture.keys(GENERAL_BIN);

    fixture.query(UPDATE_BY_ID, update_args(5));
    assert_eq!(fixture.keys(KV_BIN), kv_once);
    assert_eq!(fixture.keys(GENERAL_BIN), general_once);
    assert_eq!(kv_once, vec!["kv:id=6".to_string()]);
    assert!(general_once.is_empty());
}

#[test]
fn test_failed_write_invalidates_nothing() {
    let fixture = key_value_fixture();
    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(ALL_USERS, QueryArgs::new());
    fixture.executor.respond(
        UPDATE_BY_ID,
        Response::Fail(ExecutorError::Query("constraint violated".to_string())),
    );

    let err = fixture
        .service
        .query(UPDATE_BY_ID, &update_args(5), &Default::default())
        .unwrap_err();

    assert_eq!(err, ExecutorError::Query("constraint violated".to_string()));
    assert_eq!(fixture.keys(KV_BIN), vec!["kv:id=5".to_string()]);
    assert_eq!(fixture.keys(GENERAL_BIN).len(), 1);
    assert_eq!(fixture.service.stats().invalidations, 0);
}

#[test]
fn test_insert_without_key_only_clears_general_pool() {
    let fixture = key_value_fixture();
    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(ALL_USERS, QueryArgs::new());

    fixture.query(
        "INSERT INTO {T} (name) VALUES (:name)",
        QueryArgs::named([("name", "Carol")]),
    );

    assert_eq!(fixture.keys(KV_BIN), vec!["kv:id=5".to_string()]);
    assert!(fixture.keys(GENERAL_BIN).is_empty());
}

#[test]
fn test_delete_without_key_clears_key_value_pool() {
    let fixture = key_value_fixture();
    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(USER_BY_ID, by_id(6));

    fixture.query(
        "DELETE FROM {T} WHERE name = :name",
        QueryArgs::named([("name", "Alice")]),
    );

    assert!(fixture.keys(KV_BIN).is_empty());
}

#[test]
fn test_positional_write_uses_registered_names() {
    let update = "UPDATE {T} SET x = ? WHERE id = ?";
    let fixture = CacheFixture::new(json!({
        "T": {
            "primary_key": ["id"],
            "key_value": { "query": USER_BY_ID },
            "queries": { update: { "args": ["x", "id"] } }
        }
    }));

    fixture.query(USER_BY_ID, by_id(5));
    fixture.query(USER_BY_ID, by_id(6));
    fixture.query(update, QueryArgs::positional([1i64, 6]));

    assert_eq!(fixture.keys(KV_BIN), vec!["kv:id=5".to_string()]);
}

#[test]
fn test_plain_table_write_clears_general_pool() {
    let fixture = CacheFixture::new(json!({ "T": true }));
    fixture.query(ALL_USERS, QueryArgs::new());
    fixture.query(USER_BY_ID, by_id(5));
    assert_eq!(fixture.keys(GENERAL_BIN).len(), 2);

    fixture.query("DELETE FROM {T} WHERE id = :id", by_id(5));

    assert!(fixture.keys(GENERAL_BIN).is_empty());
    assert!(fixture.pool(KV_BIN).is_none());
}

#[test]
fn test_write_result_is_returned_unchanged() {
    let fixture = CacheFixture::new(json!({ "T": true }));
    fixture
        .executor
        .respond(UPDATE_BY_ID, Response::Opaque(Value::from(1i64)));

    assert_eq!(
        fixture.query(UPDATE_BY_ID, update_args(5)),
        QueryOutput::Opaque(Value::from(1i64))
    );
}

#[test]
fn test_failed_invalidation_is_reported_not_returned() {
    let fixture = key_value_fixture();
    fixture
        .executor
        .respond(UPDATE_BY_ID, Response::Opaque(Value::from(1i64)));
    fixture.pools.set_available(false);

    let output = fixture.query(UPDATE_BY_ID, update_args(5));

    assert_eq!(output, QueryOutput::Opaque(Value::from(1i64)));
    assert_eq!(
        fixture
            .observer
            .count(|e| matches!(e, CacheEvent::InvalidationFailed { .. })),
        2
    );
    assert_eq!(fixture.service.stats().pool_failures, 2);
}

#[test]
fn test_write_on_unconfigured_table_skips_invalidation() {
    let fixture = CacheFixture::new(json!({ "T": true }));
    fixture.query(ALL_USERS, QueryArgs::new());

    fixture.query("DELETE FROM {other}", QueryArgs::new());

    assert_eq!(fixture.keys(GENERAL_BIN).len(), 1);
    assert_eq!(fixture.service.stats().invalidations, 0);
}
