// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read pipeline
//!
//! A read query runs through an ordered chain of named stages. Each stage
//! either answers the call itself or hands it to the rest of the chain
//! through [`Next`]. The chain is fixed when the service is built:
//!
//! ```text
//! test_query -> map_reduce -> cache -> final
//! ```
//!
//! `final` calls the executor and never delegates. It cannot be removed and
//! always stays last.

pub mod cache;
pub mod direct;
pub mod map_reduce;
pub mod test_query;

pub use cache::CacheStage;
pub use direct::FinalStage;
pub use map_reduce::MapReduceStage;
pub use test_query::TestQueryStage;

use std::fmt;
use std::sync::Arc;

use crate::args::{QueryArgs, QueryOptions};
use crate::config::CacheConfiguration;
use crate::error::{ConfigurationError, ExecutorError};
use crate::events::CacheEvent;
use crate::pool::CachePoolFactory;
use crate::query::CachedQuery;
use crate::result::QueryOutput;
use crate::service::Engine;

pub const TEST_QUERY_STAGE: &str = "test_query";
pub const MAP_REDUCE_STAGE: &str = "map_reduce";
pub const CACHE_STAGE: &str = "cache";
pub const FINAL_STAGE: &str = "final";

/// One step of the read pipeline
pub trait Stage: Send + Sync {
    /// Unique name used to position stages in a [`PipelineBuilder`]
    fn name(&self) -> &str;

    /// Answer the call, or delegate with `next.run(call)`
    fn handle(&self, call: &CachedQuery<'_>, next: Next<'_>) -> Result<QueryOutput, ExecutorError>;
}

/// The stages after the current one, plus access to the service internals
/// a stage may need
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    engine: &'a Engine,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<dyn Stage>], engine: &'a Engine) -> Self {
        Self { stages, engine }
    }

    /// Hand the call to the remaining stages
    pub fn run(self, call: &CachedQuery<'_>) -> Result<QueryOutput, ExecutorError> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(call, Next::new(rest, self.engine)),
            None => self.execute_direct(call),
        }
    }

    /// Run the call against the executor, bypassing every stage
    pub fn execute_direct(&self, call: &CachedQuery<'_>) -> Result<QueryOutput, ExecutorError> {
        self.engine
            .executor()
            .query(call.query(), call.args(), call.options())
    }

    pub fn pools(&self) -> &'a dyn CachePoolFactory {
        self.engine.pools()
    }

    /// Report an event to the service's observer and counters
    pub fn report(&self, event: CacheEvent) {
        self.engine.events().emit(event);
    }

    /// Re-enter the service's outer entry point for another query under
    /// the same configuration snapshot
    pub(crate) fn dispatch(
        &self,
        snapshot: &Arc<CacheConfiguration>,
        query: &str,
        args: &QueryArgs,
        options: &QueryOptions,
    ) -> Result<QueryOutput, ExecutorError> {
        self.engine.dispatch(snapshot, query, args, options)
    }
}

/// An immutable, ordered stage chain
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub(crate) fn run(
        &self,
        engine: &Engine,
        call: &CachedQuery<'_>,
    ) -> Result<QueryOutput, ExecutorError> {
        Next::new(&self.stages, engine).run(call)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        PipelineBuilder::new().build()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builds a [`Pipeline`] once, at service construction
pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Stage>>,
}

impl PipelineBuilder {
    /// The standard chain: `test_query`, `map_reduce`, `cache`, `final`
    pub fn new() -> Self {
        Self {
            stages: vec![
                Arc::new(TestQueryStage),
                Arc::new(MapReduceStage),
                Arc::new(CacheStage),
                Arc::new(FinalStage),
            ],
        }
    }

    /// Only the terminal stage: every read goes straight to the executor
    pub fn bare() -> Self {
        Self {
            stages: vec![Arc::new(FinalStage)],
        }
    }

    pub fn insert_before(
        self,
        anchor: &str,
        stage: impl Stage + 'static,
    ) -> Result<Self, ConfigurationError> {
        let index = self.position(anchor)?;
        self.insert_at(index, Arc::new(stage))
    }

    pub fn insert_after(
        self,
        anchor: &str,
        stage: impl Stage + 'static,
    ) -> Result<Self, ConfigurationError> {
        if anchor == FINAL_STAGE {
            return Err(ConfigurationError::Pipeline(format!(
                "nothing can run after '{}'",
                FINAL_STAGE
            )));
        }
        let index = self.position(anchor)?;
        self.insert_at(index + 1, Arc::new(stage))
    }

    pub fn remove(mut self, name: &str) -> Result<Self, ConfigurationError> {
        if name == FINAL_STAGE {
            return Err(ConfigurationError::Pipeline(format!(
                "'{}' cannot be removed",
                FINAL_STAGE
            )));
        }
        let index = self.position(name)?;
        self.stages.remove(index);
        Ok(self)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }

    fn position(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.stages
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| ConfigurationError::Pipeline(format!("no stage named '{}'", name)))
    }

    fn insert_at(
        mut self,
        index: usize,
        stage: Arc<dyn Stage>,
    ) -> Result<Self, ConfigurationError> {
        if self.stages.iter().any(|s| s.name() == stage.name()) {
            return Err(ConfigurationError::Pipeline(format!(
                "stage '{}' is already present",
                stage.name()
            )));
        }
        self.stages.insert(index, stage);
        Ok(self)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
