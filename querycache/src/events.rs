// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache events, observers and statistics

use parking_lot::RwLock;
use std::fmt;

use crate::error::PoolError;

/// A self-test mismatch that a concurrent write cannot explain
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyFault {
    pub table: String,
    pub query: String,
    /// Rows the pipeline served
    pub served_rows: Option<usize>,
    /// Rows the executor returned directly
    pub direct_rows: Option<usize>,
}

impl fmt::Display for ConsistencyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cached result for '{}' on table '{}' differs from the executor ({:?} rows served, {:?} rows direct)",
            self.query, self.table, self.served_rows, self.direct_rows
        )
    }
}

/// Events for monitoring and debugging
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEvent {
    Hit {
        bin: String,
        key: String,
    },
    Miss {
        bin: String,
        key: String,
    },
    Stored {
        bin: String,
        key: String,
        rows: usize,
    },
    /// Query ran without the cache (not cacheable or not configured)
    Bypassed {
        query: String,
    },
    /// One point entry was deleted
    KeyInvalidated {
        bin: String,
        key: String,
    },
    /// A whole bin was cleared
    BinCleared {
        bin: String,
    },
    /// A read degraded to direct execution because the pool failed
    PoolUnavailable {
        bin: String,
        error: PoolError,
    },
    /// An invalidation could not be applied; cached data may be stale
    InvalidationFailed {
        bin: String,
        error: PoolError,
    },
    /// Per-call configuration could not be applied; the call ran uncached
    ConfigurationSkipped {
        query: String,
        reason: String,
    },
    SelfTestPassed {
        query: String,
    },
    /// Mismatch explained by data changing between the two direct reads
    BenignRace {
        query: String,
    },
    ConsistencyFault(ConsistencyFault),
}

/// Observability channel the service reports events to
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent);
}

/// Observer writing events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl CacheObserver for LogObserver {
    fn on_event(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Hit { bin, key } => log::debug!("Cache hit in '{}': {}", bin, key),
            CacheEvent::Miss { bin, key } => log::debug!("Cache miss in '{}': {}", bin, key),
            CacheEvent::Stored { bin, key, rows } => {
                log::debug!("Cached {} row(s) in '{}': {}", rows, bin, key)
            }
            CacheEvent::Bypassed { query } => log::debug!("Cache bypassed: {}", query),
            CacheEvent::KeyInvalidated { bin, key } => {
                log::debug!("Invalidated '{}' in '{}'", key, bin)
            }
            CacheEvent::BinCleared { bin } => log::debug!("Cleared cache bin '{}'", bin),
            CacheEvent::PoolUnavailable { bin, error } => {
                log::warn!("Cache pool '{}' failed, executing directly: {}", bin, error)
            }
            CacheEvent::InvalidationFailed { bin, error } => log::error!(
                "Invalidation of cache bin '{}' failed, cached results may be stale: {}",
                bin,
                error
            ),
            CacheEvent::ConfigurationSkipped { query, reason } => {
                log::warn!("Cache configuration not applied to '{}': {}", query, reason)
            }
            CacheEvent::SelfTestPassed { query } => log::debug!("Self-test passed: {}", query),
            CacheEvent::BenignRace { query } => log::info!(
                "Self-test mismatch for '{}' explained by a concurrent write",
                query
            ),
            CacheEvent::ConsistencyFault(fault) => log::error!("Cache consistency fault: {}", fault),
        }
    }
}

/// Counters kept by the service
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub bypassed: u64,
    pub invalidations: u64,
    pub pool_failures: u64,
    pub self_tests: u64,
    pub benign_races: u64,
    pub consistency_faults: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    fn record(&mut self, event: &CacheEvent) {
        match event {
            CacheEvent::Hit { .. } => self.hits += 1,
            CacheEvent::Miss { .. } => self.misses += 1,
            CacheEvent::Stored { .. } => self.stores += 1,
            CacheEvent::Bypassed { .. } | CacheEvent::ConfigurationSkipped { .. } => {
                self.bypassed += 1
            }
            CacheEvent::KeyInvalidated { .. } | CacheEvent::BinCleared { .. } => {
                self.invalidations += 1
            }
            CacheEvent::PoolUnavailable { .. } | CacheEvent::InvalidationFailed { .. } => {
                self.pool_failures += 1
            }
            CacheEvent::SelfTestPassed { .. } => self.self_tests += 1,
            CacheEvent::BenignRace { .. } => {
                self.self_tests += 1;
                self.benign_races += 1;
            }
            CacheEvent::ConsistencyFault(_) => {
                self.self_tests += 1;
                self.consistency_faults += 1;
            }
        }
    }
}

/// Fans events out to the observer and keeps the counters
pub(crate) struct EventSink {
    observer: Box<dyn CacheObserver>,
    stats: RwLock<CacheStats>,
}

impl EventSink {
    pub(crate) fn new(observer: Box<dyn CacheObserver>) -> Self {
        Self {
            observer,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        self.stats.write().record(&event);
        self.observer.on_event(&event);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    pub(crate) fn reset_stats(&self) {
        *self.stats.write() = CacheStats::default();
    }
}
