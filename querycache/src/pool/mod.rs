// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache pool interfaces
//!
//! A cache pool is an external key-value store scoped to one bin. The cache
//! layer never transforms what it stores: rows written with
//! [`CachePool::set`] come back from [`CachePool::get_multiple`] unchanged.
//! Persistence, eviction and expiry are the pool's business.

pub mod memory;

pub use memory::{MemoryPool, MemoryPoolFactory};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::PoolError;
use crate::row::ResultSet;

/// Reference to a pool bin plus the entry policy used when writing to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolRef {
    /// Bin name; one bin per table and purpose
    pub bin: String,

    /// Time-to-live for entries written to this bin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    /// Tags attached to every entry written to this bin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PoolRef {
    pub fn new(bin: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            ttl_secs: None,
            tags: Vec::new(),
        }
    }

    pub fn entry_options(&self) -> EntryOptions {
        EntryOptions {
            ttl: self.ttl_secs.map(Duration::from_secs),
            tags: self.tags.clone(),
        }
    }
}

/// Per-entry write policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub ttl: Option<Duration>,
    pub tags: Vec<String>,
}

/// A single cache bin
pub trait CachePool: Send + Sync {
    /// Bin this pool serves
    fn bin(&self) -> &str;

    /// Fetch several keys at once; absent keys are simply missing from the map
    fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, ResultSet>, PoolError>;

    /// Store rows under a key, overwriting any previous entry
    fn set(&self, key: &str, rows: ResultSet, options: &EntryOptions) -> Result<(), PoolError>;

    /// Remove one key; removing an absent key is not an error
    fn delete_item(&self, key: &str) -> Result<(), PoolError>;

    /// Remove every entry in the bin
    fn clear(&self) -> Result<(), PoolError>;
}

/// Hands out pools by reference
pub trait CachePoolFactory: Send + Sync {
    fn get(&self, pool: &PoolRef) -> Result<Arc<dyn CachePool>, PoolError>;
}
