// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory cache pool for testing and single-process embedding

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::{CachePool, CachePoolFactory, EntryOptions, PoolRef};
use crate::error::PoolError;
use crate::row::ResultSet;

#[derive(Debug, Clone)]
struct MemoryEntry {
    rows: ResultSet,
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Instant::now() >= at)
    }
}

/// In-memory pool for one bin
pub struct MemoryPool {
    bin: String,
    data: RwLock<HashMap<String, MemoryEntry>>,
    available: Arc<AtomicBool>,
}

impl MemoryPool {
    /// Create a new, always-available memory pool
    pub fn new(bin: impl Into<String>) -> Self {
        Self::with_availability(bin, Arc::new(AtomicBool::new(true)))
    }

    fn with_availability(bin: impl Into<String>, available: Arc<AtomicBool>) -> Self {
        Self {
            bin: bin.into(),
            data: RwLock::new(HashMap::new()),
            available,
        }
    }

    /// Keys currently stored (expired entries excluded), sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data
            .read()
            .get(key)
            .map_or(false, |entry| !entry.is_expired())
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tags recorded for a key
    pub fn tags(&self, key: &str) -> Option<Vec<String>> {
        self.data.read().get(key).map(|entry| entry.tags.clone())
    }

    fn check_available(&self) -> Result<(), PoolError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PoolError::Unavailable(self.bin.clone()))
        }
    }
}

impl CachePool for MemoryPool {
    fn bin(&self) -> &str {
        &self.bin
    }

    fn get_multiple(&self, keys: &[String]) -> Result<HashMap<String, ResultSet>, PoolError> {
        self.check_available()?;
        let data = self.data.read();
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = data.get(key) {
                if !entry.is_expired() {
                    found.insert(key.clone(), entry.rows.clone());
                }
            }
        }
        Ok(found)
    }

    fn set(&self, key: &str, rows: ResultSet, options: &EntryOptions) -> Result<(), PoolError> {
        self.check_available()?;
        let entry = MemoryEntry {
            rows,
            expires_at: options.ttl.map(|ttl| Instant::now() + ttl),
            tags: options.tags.clone(),
        };
        self.data.write().insert(key.to_string(), entry);
        Ok(())
    }

    fn delete_item(&self, key: &str) -> Result<(), PoolError> {
        self.check_available()?;
        self.data.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), PoolError> {
        self.check_available()?;
        self.data.write().clear();
        Ok(())
    }
}

/// Factory creating one [`MemoryPool`] per bin on first use
pub struct MemoryPoolFactory {
    pools: RwLock<HashMap<String, Arc<MemoryPool>>>,
    available: Arc<AtomicBool>,
}

impl MemoryPoolFactory {
    pub fn new() -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Look up an existing pool without creating it
    pub fn pool(&self, bin: &str) -> Option<Arc<MemoryPool>> {
        self.pools.read().get(bin).cloned()
    }

    /// Simulate an outage: while unavailable, every pool call fails
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Default for MemoryPoolFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CachePoolFactory for MemoryPoolFactory {
    fn get(&self, pool: &PoolRef) -> Result<Arc<dyn CachePool>, PoolError> {
        if let Some(existing) = self.pools.read().get(&pool.bin) {
            return Ok(existing.clone());
        }

        let mut pools = self.pools.write();
        let created = pools
            .entry(pool.bin.clone())
            .or_insert_with(|| {
                Arc::new(MemoryPool::with_availability(
                    pool.bin.clone(),
                    self.available.clone(),
                ))
            })
            .clone();
        Ok(created)
    }
}
