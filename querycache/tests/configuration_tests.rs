//! Tests for configuration normalization and validation through the
//! public API

use querycache::config::TableFlavor;
use querycache::filter::{Direction, WhereCondition};
use querycache::{CacheConfiguration, ConfigurationError, Value};
use serde_json::json;

fn full_document() -> serde_json::Value {
    json!({
        "users": {
            "cache_pool": { "bin": "users_bin", "ttl_secs": 60, "tags": ["users"] },
            "cache_key_prefix": ["v2"],
            "primary_key": ["id"],
            "test_sample_rate": 5,
            "key_value": {
                "key_columns": ["id"],
                "query": "SELECT * FROM users WHERE id = :id"
            },
            "queries": {
                "SELECT * FROM {users} WHERE org = ? AND role = ?": {
                    "args": ["org", "role"],
                    "test_sample_rate": 50,
                    "map_reduce": {
                        "query": "SELECT * FROM {users} WHERE org = :org",
                        "args": ["org"],
                        "filter": {
                            "where": ["role", { "active": true }],
                            "order": [{ "column": "name", "collation": "case_insensitive" },
                                      { "column": "id", "direction": "desc" }],
                            "select": ["id", "name"]
                        }
                    }
                }
            }
        },
        "audit": false
    })
}

#[test]
fn test_full_document_normalizes() {
    let config = CacheConfiguration::from_raw(&full_document()).unwrap();
    assert_eq!(config.table_names(), vec!["users"]);

    let users = config.table("users").unwrap();
    assert_eq!(users.cache_pool.bin, "users_bin");
    assert_eq!(users.cache_pool.ttl_secs, Some(60));
    assert!(users.cache_all_queries);
    assert_eq!(users.test_sample_rate, 5);

    match &users.flavor {
        TableFlavor::KeyValue(kv) => {
            assert_eq!(kv.cache_pool.bin, "query_cache_users_kv");
            assert_eq!(kv.key_columns, vec!["id".to_string()]);
            assert_eq!(kv.rewritten_args, vec!["id".to_string()]);
        }
        TableFlavor::Plain => panic!("expected a key-value table"),
    }

    let query_override = users
        .query_override("SELECT * FROM {users}  WHERE org = ? AND role = ?")
        .unwrap();
    assert_eq!(query_override.test_sample_rate, Some(50));
    let spec = query_override.map_reduce.as_ref().unwrap();
    assert_eq!(spec.source_args, vec!["org".to_string()]);
    assert_eq!(
        spec.filter.conditions,
        vec![
            WhereCondition::Argument {
                column: "role".to_string()
            },
            WhereCondition::Equals {
                column: "active".to_string(),
                value: Value::Boolean(true)
            },
        ]
    );
    assert_eq!(spec.filter.order[1].direction, Direction::Desc);
}

#[test]
fn test_normalization_is_idempotent() {
    let config = CacheConfiguration::from_raw(&full_document()).unwrap();
    let raw = config.to_raw();
    let again = CacheConfiguration::from_raw(&raw).unwrap();

    assert_eq!(again, config);
    assert_eq!(again.to_raw(), raw);
}

#[test]
fn test_invalid_documents_are_rejected() {
    let cases = vec![
        json!({ "t": { "test_sample_rate": 150 } }),
        json!({ "t": { "key_value": true } }),
        json!({ "t": { "primary_key": ["id"], "key_value": { "key_columns": ["other"] } } }),
        json!({ "t": { "queries": { "SELECT 1": { "args": ["a", "a"] } } } }),
        json!({ "t": { "queries": { "SELECT 1": { "map_reduce": { "query": " " } } } } }),
        json!({ "t": { "queries": { "SELECT 1": { "map_reduce": { "query": "SELECT  1" } } } } }),
        json!({ "t": "yes" }),
    ];

    for case in cases {
        assert!(
            CacheConfiguration::from_raw(&case).is_err(),
            "accepted invalid document {}",
            case
        );
    }
}

#[test]
fn test_errors_name_the_table() {
    let err = CacheConfiguration::from_raw(&json!({ "users": { "key_value": true } })).unwrap_err();
    match err {
        ConfigurationError::InvalidTable { table, .. } => assert_eq!(table, "users"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_misspelled_fields_are_malformed() {
    let cases = vec![
        json!({ "users": { "cache_all_query": false } }),
        json!({ "users": { "primary_key": ["id"], "key_value": { "keycolumns": ["id"] } } }),
        json!({ "users": { "queries": { "SELECT 1": { "cached": false } } } }),
        json!({ "users": { "queries": { "SELECT 1": {
            "map_reduce": { "query": "SELECT 2", "filter": { "wher": { "a": 1 } } }
        } } } }),
    ];

    for case in cases {
        match CacheConfiguration::from_raw(&case) {
            Err(ConfigurationError::Malformed(_)) => {}
            other => panic!("expected a malformed document for {}, got {:?}", case, other),
        }
    }
}
