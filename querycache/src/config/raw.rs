// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Raw configuration documents as produced by an external loader
//!
//! Every field is optional; normalization fills in the defaults. Unknown
//! fields are rejected. The normalized model converts back into this shape
//! with every field spelled out, so a round trip normalizes to the same
//! configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filter::OrderKey;
use crate::pool::PoolRef;
use crate::value::Value;

/// Top-level document: table name to entry
pub type RawConfiguration = BTreeMap<String, RawTableEntry>;

/// `false` disables a table, `true` enables it with defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTableEntry {
    Enabled(bool),
    Config(Box<RawTableConfig>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawTableConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_pool: Option<PoolRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_all_queries: Option<bool>,
    pub cache_key_prefix: Vec<String>,
    pub primary_key: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_sample_rate: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_value: Option<RawKeyValueEntry>,
    pub queries: BTreeMap<String, RawQueryOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawKeyValueEntry {
    Enabled(bool),
    Config(RawKeyValueConfig),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawKeyValueConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_pool: Option<PoolRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_columns: Option<Vec<String>>,
    /// Rewritten point-lookup query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Argument names bound to the rewritten query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawQueryOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_value: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_sample_rate: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_reduce: Option<RawMapReduce>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawMapReduce {
    /// Broader source query actually executed
    pub query: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub filter: RawFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawFilter {
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<RawWhere>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<OrderKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
}

/// `where` as an object of literals, or a list mixing argument-bound
/// column names and literal objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawWhere {
    Literals(BTreeMap<String, Value>),
    Entries(Vec<RawWhereEntry>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawWhereEntry {
    Argument(String),
    Literal(BTreeMap<String, Value>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_entry_shapes() {
        let doc: RawConfiguration = serde_json::from_value(json!({
            "off": false,
            "on": true,
            "custom": { "cache_all_queries": false, "primary_key": ["id"] }
        }))
        .unwrap();

        assert_eq!(doc["off"], RawTableEntry::Enabled(false));
        assert_eq!(doc["on"], RawTableEntry::Enabled(true));
        match &doc["custom"] {
            RawTableEntry::Config(config) => {
                assert_eq!(config.cache_all_queries, Some(false));
                assert_eq!(config.primary_key, vec!["id".to_string()]);
                assert!(config.queries.is_empty());
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_where_shapes() {
        let literals: RawWhere = serde_json::from_value(json!({ "status": "active" })).unwrap();
        assert!(matches!(literals, RawWhere::Literals(_)));

        let entries: RawWhere =
            serde_json::from_value(json!(["uid", { "status": "active" }])).unwrap();
        match entries {
            RawWhere::Entries(items) => {
                assert_eq!(items[0], RawWhereEntry::Argument("uid".to_string()));
                assert!(matches!(items[1], RawWhereEntry::Literal(_)));
            }
            other => panic!("unexpected where: {:?}", other),
        }
    }

    #[test]
    fn test_order_defaults() {
        let filter: RawFilter =
            serde_json::from_value(json!({ "order": [{ "column": "name" }] })).unwrap();
        assert_eq!(filter.order, vec![OrderKey::asc("name")]);
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let typo = serde_json::from_value::<RawConfiguration>(json!({
            "users": { "cache_all_query": false }
        }));
        assert!(typo.is_err());

        let nested = serde_json::from_value::<RawKeyValueConfig>(json!({ "key_column": ["id"] }));
        assert!(nested.is_err());

        let pool = serde_json::from_value::<PoolRef>(json!({ "bin": "b", "ttl": 5 }));
        assert!(pool.is_err());
    }
}
