// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration
//!
//! This module provides:
//! - Raw configuration documents (`raw`) as read by an external loader
//! - The normalized, immutable per-table model (`table`)
//! - [`CacheConfiguration`], the snapshot a service runs against

pub mod raw;
pub mod table;

pub use raw::{RawConfiguration, RawTableConfig, RawTableEntry};
pub use table::{
    KeyValueConfig, MapReduceSpec, QueryOverride, TableConfiguration, TableFlavor,
    MAX_SAMPLE_RATE,
};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::classifier::{extract_table_identifier, normalize_query_text};
use crate::error::ConfigurationError;

/// Immutable configuration snapshot: every enabled table plus an index of
/// registered query texts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheConfiguration {
    tables: HashMap<String, Arc<TableConfiguration>>,
    /// Normalized registered query text to table name
    registered: HashMap<String, String>,
}

impl CacheConfiguration {
    /// Configuration with no tables; every query passes through
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalize a raw JSON document
    pub fn from_raw(raw: &serde_json::Value) -> Result<Self, ConfigurationError> {
        let document: RawConfiguration = serde_json::from_value(raw.clone())?;
        Self::from_document(document)
    }

    /// Normalize an already deserialized document
    pub fn from_document(document: RawConfiguration) -> Result<Self, ConfigurationError> {
        let mut tables = Vec::with_capacity(document.len());
        for (name, entry) in document {
            if let Some(table) = TableConfiguration::from_entry(&name, entry)? {
                tables.push(table);
            }
        }
        Self::from_tables(tables)
    }

    /// Assemble a snapshot from normalized tables
    pub fn from_tables(tables: Vec<TableConfiguration>) -> Result<Self, ConfigurationError> {
        let mut by_name = HashMap::with_capacity(tables.len());
        let mut registered: HashMap<String, String> = HashMap::new();

        for table in tables {
            for key in table.queries.keys() {
                if let Some(first) = registered.get(key) {
                    if first != &table.name {
                        return Err(ConfigurationError::DuplicateQuery {
                            query: key.clone(),
                            first: first.clone(),
                            second: table.name.clone(),
                        });
                    }
                }
                registered.insert(key.clone(), table.name.clone());
            }
            if by_name.contains_key(&table.name) {
                return Err(ConfigurationError::InvalidTable {
                    table: table.name.clone(),
                    message: "configured twice".to_string(),
                });
            }
            by_name.insert(table.name.clone(), Arc::new(table));
        }

        let config = Self {
            tables: by_name,
            registered,
        };
        config.check_map_reduce_cycles()?;
        Ok(config)
    }

    /// Serialize back into a raw document with every default spelled out
    pub fn to_raw(&self) -> serde_json::Value {
        let document: RawConfiguration = self
            .tables
            .iter()
            .map(|(name, table)| {
                (
                    name.clone(),
                    RawTableEntry::Config(Box::new(table.to_raw())),
                )
            })
            .collect();
        serde_json::to_value(document).unwrap_or(serde_json::Value::Null)
    }

    pub fn table(&self, name: &str) -> Option<&Arc<TableConfiguration>> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table a query belongs to: an exact registered query first, then the
    /// query's single `{table}` marker.
    pub fn table_for_query(&self, query: &str) -> Option<&Arc<TableConfiguration>> {
        if !self.registered.is_empty() {
            if let Some(name) = self.registered.get(&normalize_query_text(query)) {
                return self.tables.get(name);
            }
        }
        extract_table_identifier(query).and_then(|name| self.tables.get(name))
    }

    /// Reject map-reduce chains that lead back to a query already visited
    fn check_map_reduce_cycles(&self) -> Result<(), ConfigurationError> {
        for table in self.tables.values() {
            for (start, query_override) in &table.queries {
                if query_override.map_reduce.is_none() {
                    continue;
                }

                let mut visited = HashSet::new();
                visited.insert(start.clone());
                let mut current = query_override;
                while let Some(spec) = &current.map_reduce {
                    let next_key = normalize_query_text(&spec.source_query);
                    if !visited.insert(next_key.clone()) {
                        return Err(ConfigurationError::MapReduceCycle(start.clone()));
                    }
                    match self
                        .table_for_query(&spec.source_query)
                        .and_then(|t| t.queries.get(&next_key))
                    {
                        Some(next) => current = next,
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}
