//! Service fixture over in-memory pools

use querycache::{
    MemoryPool, MemoryPoolFactory, Pipeline, QueryArgs, QueryCacheService, QueryOptions,
    QueryOutput, ResultSet,
};
use std::sync::Arc;

use super::recording::{RecordingExecutor, RecordingObserver};

/// A service with its collaborators kept at hand for assertions
pub struct CacheFixture {
    pub service: QueryCacheService,
    pub executor: Arc<RecordingExecutor>,
    pub pools: Arc<MemoryPoolFactory>,
    pub observer: RecordingObserver,
}

impl CacheFixture {
    /// Standard pipeline with the given raw configuration installed
    pub fn new(config: serde_json::Value) -> Self {
        Self::with_pipeline(config, Pipeline::default())
    }

    pub fn with_pipeline(config: serde_json::Value, pipeline: Pipeline) -> Self {
        super::init_logging();

        let executor = RecordingExecutor::new();
        let pools = Arc::new(MemoryPoolFactory::new());
        let observer = RecordingObserver::new();
        let service = QueryCacheService::new(executor.clone(), pools.clone())
            .with_observer(observer.clone())
            .with_pipeline(pipeline);
        service
            .set_configuration(&config)
            .expect("Failed to install test configuration");

        Self {
            service,
            executor,
            pools,
            observer,
        }
    }

    pub fn query(&self, query: &str, args: QueryArgs) -> QueryOutput {
        self.service
            .query(query, &args, &QueryOptions::new())
            .expect("Query failed")
    }

    /// Run a read and return its rows
    pub fn rows(&self, query: &str, args: QueryArgs) -> ResultSet {
        self.query(query, args)
            .into_rows()
            .expect("Query did not return rows")
    }

    pub fn pool(&self, bin: &str) -> Option<Arc<MemoryPool>> {
        self.pools.pool(bin)
    }

    /// Keys held by a bin, empty when the bin was never used
    pub fn keys(&self, bin: &str) -> Vec<String> {
        self.pool(bin).map(|p| p.keys()).unwrap_or_default()
    }
}
