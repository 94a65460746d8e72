// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query cache service
//!
//! [`QueryCacheService`] sits between an application and its executor.
//! Every call is matched to a table configuration and classified:
//! - writes run first, then invalidate the table's cached results
//! - reads go through the [`Pipeline`]
//! - anything else, or any query on an unconfigured table, passes through

use parking_lot::RwLock;
use std::sync::Arc;

use crate::args::{QueryArgs, QueryOptions};
use crate::classifier::classify;
use crate::config::CacheConfiguration;
use crate::error::{ConfigurationError, ExecutorError};
use crate::events::{CacheEvent, CacheObserver, CacheStats, EventSink, LogObserver};
use crate::executor::QueryExecutor;
use crate::invalidation::InvalidationPlan;
use crate::keys::resolve_argument_names;
use crate::pipeline::Pipeline;
use crate::pool::CachePoolFactory;
use crate::query::CachedQuery;
use crate::result::QueryOutput;

/// Collaborators shared by every call, and the dispatch logic stages
/// re-enter for rewritten queries
pub(crate) struct Engine {
    executor: Arc<dyn QueryExecutor>,
    pools: Arc<dyn CachePoolFactory>,
    events: EventSink,
    pipeline: Pipeline,
}

impl Engine {
    pub(crate) fn executor(&self) -> &dyn QueryExecutor {
        self.executor.as_ref()
    }

    pub(crate) fn pools(&self) -> &dyn CachePoolFactory {
        self.pools.as_ref()
    }

    pub(crate) fn events(&self) -> &EventSink {
        &self.events
    }

    /// Route one call under a fixed configuration snapshot
    pub(crate) fn dispatch(
        &self,
        snapshot: &Arc<CacheConfiguration>,
        query: &str,
        args: &QueryArgs,
        options: &QueryOptions,
    ) -> Result<QueryOutput, ExecutorError> {
        let table = match snapshot.table_for_query(query) {
            Some(table) => table,
            None => {
                self.events.emit(CacheEvent::Bypassed {
                    query: query.to_string(),
                });
                return self.executor.query(query, args, options);
            }
        };

        let verb = classify(query);
        if verb.is_mutating() {
            // An executor error skips invalidation: the write never happened
            let output = self.executor.query(query, args, options)?;

            let names = table
                .query_override(query)
                .and_then(|o| o.argument_names.as_deref());
            let named = match resolve_argument_names(args, names) {
                Ok(named) => Some(named),
                Err(e) => {
                    log::warn!(
                        "Cannot bind arguments of '{}', invalidating without a point key: {}",
                        query,
                        e
                    );
                    None
                }
            };

            let plan = InvalidationPlan::for_write(table, verb, named.as_ref());
            log::debug!("Invalidating after {} on '{}': {:?}", verb, table.name, plan);
            plan.apply(self.pools.as_ref(), &self.events);
            return Ok(output);
        }

        if !verb.is_read() {
            self.events.emit(CacheEvent::Bypassed {
                query: query.to_string(),
            });
            return self.executor.query(query, args, options);
        }

        match CachedQuery::new(query, args, options, table, snapshot) {
            Ok(call) => self.pipeline.run(self, &call),
            Err(e) => {
                self.events.emit(CacheEvent::ConfigurationSkipped {
                    query: query.to_string(),
                    reason: e.to_string(),
                });
                self.executor.query(query, args, options)
            }
        }
    }
}

/// Transparent caching façade over a [`QueryExecutor`]
pub struct QueryCacheService {
    engine: Engine,
    config: RwLock<Arc<CacheConfiguration>>,
}

impl QueryCacheService {
    /// Service with no tables configured, the standard pipeline and a
    /// [`LogObserver`]
    pub fn new(executor: Arc<dyn QueryExecutor>, pools: Arc<dyn CachePoolFactory>) -> Self {
        Self {
            engine: Engine {
                executor,
                pools,
                events: EventSink::new(Box::new(LogObserver)),
                pipeline: Pipeline::default(),
            },
            config: RwLock::new(Arc::new(CacheConfiguration::empty())),
        }
    }

    pub fn with_observer(mut self, observer: impl CacheObserver + 'static) -> Self {
        self.engine.events = EventSink::new(Box::new(observer));
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.engine.pipeline = pipeline;
        self
    }

    pub fn with_configuration(self, config: CacheConfiguration) -> Self {
        *self.config.write() = Arc::new(config);
        self
    }

    /// Run a query, from cache where configured.
    ///
    /// Only executor errors are returned; configuration and pool problems
    /// degrade to uncached execution.
    pub fn query(
        &self,
        query: &str,
        args: &QueryArgs,
        options: &QueryOptions,
    ) -> Result<QueryOutput, ExecutorError> {
        let snapshot = self.configuration();
        self.engine.dispatch(&snapshot, query, args, options)
    }

    /// Normalize and install a raw configuration document.
    ///
    /// Calls already running keep the snapshot they started with. On error
    /// the previous configuration stays active.
    pub fn set_configuration(&self, raw: &serde_json::Value) -> Result<(), ConfigurationError> {
        let config = CacheConfiguration::from_raw(raw)?;
        log::info!(
            "Installing cache configuration for {} table(s)",
            config.table_names().len()
        );
        *self.config.write() = Arc::new(config);
        Ok(())
    }

    /// Current configuration snapshot
    pub fn configuration(&self) -> Arc<CacheConfiguration> {
        self.config.read().clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.engine.pipeline
    }

    pub fn stats(&self) -> CacheStats {
        self.engine.events.stats()
    }

    pub fn reset_stats(&self) {
        self.engine.events.reset_stats();
    }
}
