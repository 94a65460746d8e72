// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Normalized per-table cache policy

use std::collections::{BTreeMap, HashMap, HashSet};

use super::raw::{
    RawFilter, RawKeyValueConfig, RawKeyValueEntry, RawMapReduce, RawQueryOverride,
    RawTableConfig, RawTableEntry, RawWhere, RawWhereEntry,
};
use crate::classifier::normalize_query_text;
use crate::error::ConfigurationError;
use crate::filter::{FilterSpec, WhereCondition};
use crate::pool::PoolRef;

/// Upper bound of every sample rate
pub const MAX_SAMPLE_RATE: u8 = 100;

/// Table flavor, chosen once at normalization time
#[derive(Debug, Clone, PartialEq)]
pub enum TableFlavor {
    /// General query cache only
    Plain,
    /// General query cache plus primary-key point entries
    KeyValue(KeyValueConfig),
}

/// Point-lookup cache settings of a key-value table
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueConfig {
    pub cache_pool: PoolRef,
    /// Columns forming the point key, in key order
    pub key_columns: Vec<String>,
    /// Canonical point-lookup query used to fill misses
    pub rewritten_query: Option<String>,
    /// Argument names bound to `rewritten_query`, in its placeholder order
    pub rewritten_args: Vec<String>,
}

/// Map-reduce rewrite of a narrow query onto a broader one
#[derive(Debug, Clone, PartialEq)]
pub struct MapReduceSpec {
    pub source_query: String,
    pub source_args: Vec<String>,
    pub filter: FilterSpec,
}

/// Policy registered for one query text
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOverride {
    /// Query text as registered
    pub query: String,
    pub argument_names: Option<Vec<String>>,
    pub cacheable: bool,
    /// Whether point-key caching may serve this query
    pub key_value: bool,
    pub map_reduce: Option<MapReduceSpec>,
    pub test_sample_rate: Option<u8>,
}

/// Cache policy of one table; immutable once built
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfiguration {
    pub name: String,
    pub cache_pool: PoolRef,
    pub cache_all_queries: bool,
    pub cache_key_prefix: Vec<String>,
    pub primary_key: Vec<String>,
    pub test_sample_rate: u8,
    pub flavor: TableFlavor,
    /// Overrides keyed by normalized query text
    pub queries: HashMap<String, QueryOverride>,
}

impl TableConfiguration {
    /// Default bin of a table's general pool
    pub fn default_bin(table: &str) -> String {
        format!("query_cache_{}", table)
    }

    /// Default bin of a table's key-value pool
    pub fn default_kv_bin(table: &str) -> String {
        format!("query_cache_{}_kv", table)
    }

    /// Normalize one raw entry. `Ok(None)` means the table is disabled.
    pub fn from_entry(
        name: &str,
        entry: RawTableEntry,
    ) -> Result<Option<Self>, ConfigurationError> {
        match entry {
            RawTableEntry::Enabled(false) => Ok(None),
            RawTableEntry::Enabled(true) => Self::from_raw(name, RawTableConfig::default()).map(Some),
            RawTableEntry::Config(raw) => Self::from_raw(name, *raw).map(Some),
        }
    }

    /// Normalize a raw JSON table object
    pub fn from_raw_json(name: &str, json: &serde_json::Value) -> Result<Self, ConfigurationError> {
        let raw: RawTableConfig = serde_json::from_value(json.clone())?;
        Self::from_raw(name, raw)
    }

    /// Fill defaults and validate
    pub fn from_raw(name: &str, raw: RawTableConfig) -> Result<Self, ConfigurationError> {
        let invalid = |message: String| ConfigurationError::InvalidTable {
            table: name.to_string(),
            message,
        };

        if name.trim().is_empty() {
            return Err(invalid("table name is empty".to_string()));
        }

        let test_sample_rate = raw.test_sample_rate.unwrap_or(0);
        check_sample_rate(test_sample_rate).map_err(invalid)?;
        check_unique(&raw.primary_key, "primary key column").map_err(invalid)?;

        let cache_pool = raw
            .cache_pool
            .unwrap_or_else(|| PoolRef::new(Self::default_bin(name)));
        let cache_all_queries = raw.cache_all_queries.unwrap_or(true);
        let mut primary_key = raw.primary_key;

        let flavor = match raw.key_value {
            None | Some(RawKeyValueEntry::Enabled(false)) => TableFlavor::Plain,
            Some(RawKeyValueEntry::Enabled(true)) => TableFlavor::KeyValue(normalize_key_value(
                name,
                RawKeyValueConfig::default(),
                &mut primary_key,
            )?),
            Some(RawKeyValueEntry::Config(kv)) => {
                TableFlavor::KeyValue(normalize_key_value(name, kv, &mut primary_key)?)
            }
        };

        let mut queries = HashMap::with_capacity(raw.queries.len());
        for (query, raw_override) in raw.queries {
            let key = normalize_query_text(&query);
            if key.is_empty() {
                return Err(invalid("registered query text is empty".to_string()));
            }
            let normalized = normalize_override(name, &key, query, raw_override, cache_all_queries)?;
            if queries.insert(key.clone(), normalized).is_some() {
                return Err(ConfigurationError::InvalidQuery {
                    table: name.to_string(),
                    query: key,
                    message: "registered twice".to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            cache_pool,
            cache_all_queries,
            cache_key_prefix: raw.cache_key_prefix,
            primary_key,
            test_sample_rate,
            flavor,
            queries,
        })
    }

    /// Spell every field out in raw form
    pub fn to_raw(&self) -> RawTableConfig {
        let key_value = match &self.flavor {
            TableFlavor::Plain => RawKeyValueEntry::Enabled(false),
            TableFlavor::KeyValue(kv) => RawKeyValueEntry::Config(RawKeyValueConfig {
                cache_pool: Some(kv.cache_pool.clone()),
                key_columns: Some(kv.key_columns.clone()),
                query: kv.rewritten_query.clone(),
                args: Some(kv.rewritten_args.clone()),
            }),
        };

        let queries = self
            .queries
            .values()
            .map(|o| (o.query.clone(), override_to_raw(o)))
            .collect();

        RawTableConfig {
            cache_pool: Some(self.cache_pool.clone()),
            cache_all_queries: Some(self.cache_all_queries),
            cache_key_prefix: self.cache_key_prefix.clone(),
            primary_key: self.primary_key.clone(),
            test_sample_rate: Some(self.test_sample_rate),
            key_value: Some(key_value),
            queries,
        }
    }

    /// Override registered for a query text, if any
    pub fn query_override(&self, query: &str) -> Option<&QueryOverride> {
        if self.queries.is_empty() {
            return None;
        }
        self.queries.get(&normalize_query_text(query))
    }

    pub fn key_value(&self) -> Option<&KeyValueConfig> {
        match &self.flavor {
            TableFlavor::KeyValue(kv) => Some(kv),
            TableFlavor::Plain => None,
        }
    }
}

fn normalize_key_value(
    table: &str,
    raw: RawKeyValueConfig,
    primary_key: &mut Vec<String>,
) -> Result<KeyValueConfig, ConfigurationError> {
    let invalid = |message: String| ConfigurationError::InvalidTable {
        table: table.to_string(),
        message,
    };

    let key_columns = raw.key_columns.unwrap_or_else(|| primary_key.clone());
    if key_columns.is_empty() {
        return Err(invalid(
            "key-value caching needs key columns or a primary key".to_string(),
        ));
    }
    check_unique(&key_columns, "key column").map_err(invalid)?;

    if primary_key.is_empty() {
        *primary_key = key_columns.clone();
    } else if let Some(stray) = key_columns.iter().find(|c| !primary_key.contains(c)) {
        return Err(invalid(format!(
            "key column '{}' is not part of the primary key",
            stray
        )));
    }

    let rewritten_query = raw
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());
    let rewritten_args = raw.args.unwrap_or_else(|| key_columns.clone());

    Ok(KeyValueConfig {
        cache_pool: raw
            .cache_pool
            .unwrap_or_else(|| PoolRef::new(TableConfiguration::default_kv_bin(table))),
        key_columns,
        rewritten_query,
        rewritten_args,
    })
}

fn normalize_override(
    table: &str,
    key: &str,
    query: String,
    raw: RawQueryOverride,
    cache_all_queries: bool,
) -> Result<QueryOverride, ConfigurationError> {
    let invalid = |message: String| ConfigurationError::InvalidQuery {
        table: table.to_string(),
        query: key.to_string(),
        message,
    };

    if let Some(names) = &raw.args {
        check_unique(names, "argument name").map_err(invalid)?;
    }
    if let Some(rate) = raw.test_sample_rate {
        check_sample_rate(rate).map_err(invalid)?;
    }

    let map_reduce = match raw.map_reduce {
        None => None,
        Some(mr) => {
            let source_key = normalize_query_text(&mr.query);
            if source_key.is_empty() {
                return Err(invalid("map-reduce source query is empty".to_string()));
            }
            if source_key == key {
                return Err(invalid("map-reduce source query is the query itself".to_string()));
            }
            Some(MapReduceSpec {
                source_query: mr.query.trim().to_string(),
                source_args: mr.args,
                filter: normalize_filter(mr.filter),
            })
        }
    };

    Ok(QueryOverride {
        query,
        argument_names: raw.args,
        cacheable: raw.cache.unwrap_or(cache_all_queries),
        key_value: raw.key_value.unwrap_or(true),
        map_reduce,
        test_sample_rate: raw.test_sample_rate,
    })
}

fn normalize_filter(raw: RawFilter) -> FilterSpec {
    let conditions = match raw.where_ {
        None => Vec::new(),
        Some(RawWhere::Literals(literals)) => literals
            .into_iter()
            .map(|(column, value)| WhereCondition::Equals { column, value })
            .collect(),
        Some(RawWhere::Entries(entries)) => entries
            .into_iter()
            .flat_map(|entry| match entry {
                RawWhereEntry::Argument(column) => vec![WhereCondition::Argument { column }],
                RawWhereEntry::Literal(literals) => literals
                    .into_iter()
                    .map(|(column, value)| WhereCondition::Equals { column, value })
                    .collect(),
            })
            .collect(),
    };

    FilterSpec {
        conditions,
        order: raw.order,
        select: raw.select,
    }
}

fn override_to_raw(o: &QueryOverride) -> RawQueryOverride {
    RawQueryOverride {
        args: o.argument_names.clone(),
        cache: Some(o.cacheable),
        key_value: Some(o.key_value),
        test_sample_rate: o.test_sample_rate,
        map_reduce: o.map_reduce.as_ref().map(|mr| RawMapReduce {
            query: mr.source_query.clone(),
            args: mr.source_args.clone(),
            filter: filter_to_raw(&mr.filter),
        }),
    }
}

fn filter_to_raw(filter: &FilterSpec) -> RawFilter {
    let where_ = if filter.conditions.is_empty() {
        None
    } else {
        Some(RawWhere::Entries(
            filter
                .conditions
                .iter()
                .map(|condition| match condition {
                    WhereCondition::Argument { column } => RawWhereEntry::Argument(column.clone()),
                    WhereCondition::Equals { column, value } => {
                        RawWhereEntry::Literal(BTreeMap::from([(column.clone(), value.clone())]))
                    }
                })
                .collect(),
        ))
    };

    RawFilter {
        where_,
        order: filter.order.clone(),
        select: filter.select.clone(),
    }
}

fn check_sample_rate(rate: u8) -> Result<(), String> {
    if rate > MAX_SAMPLE_RATE {
        return Err(format!(
            "test sample rate {} exceeds {}",
            rate, MAX_SAMPLE_RATE
        ));
    }
    Ok(())
}

fn check_unique(names: &[String], what: &str) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(format!("{} '{}' is listed twice", what, name));
        }
    }
    Ok(())
}
