// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! QueryCache - a transparent result cache for relational query executors
//!
//! QueryCache wraps any [`QueryExecutor`] and caches the rows of read
//! queries in external cache pools, invalidating them when writes run.
//!
//! # Features
//!
//! - **Transparent**: callers keep issuing `query(text, args, options)`
//! - **Per-table configuration**: cache pools, key prefixes, overrides per query
//! - **Key-value tables**: point reads share one entry per primary key
//! - **Map-reduce**: narrow queries answered by filtering a broader cached one
//! - **Self-test**: sampled comparison of cached and direct results
//! - **Conservative invalidation**: writes never leave stale general entries
//!
//! # Usage
//!
//! ```ignore
//! let service = QueryCacheService::new(executor, pools);
//! service.set_configuration(&serde_json::json!({
//!     "users": { "primary_key": ["id"], "key_value": true }
//! }))?;
//!
//! let rows = service.query(
//!     "SELECT * FROM {users} WHERE id = :id",
//!     &QueryArgs::named([("id", 5i64)]),
//!     &QueryOptions::new(),
//! )?;
//! ```

pub mod args;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod filter;
pub mod invalidation;
pub mod keys;
pub mod pipeline;
pub mod pool;
pub mod query;
pub mod result;
pub mod row;
pub mod service;
pub mod value;

pub use args::{ArgKey, NamedArguments, QueryArgs, QueryOptions};
pub use classifier::QueryVerb;
pub use config::{CacheConfiguration, TableConfiguration};
pub use error::{ConfigurationError, ExecutorError, PoolError};
pub use events::{CacheEvent, CacheObserver, CacheStats, ConsistencyFault, LogObserver};
pub use executor::QueryExecutor;
pub use pipeline::{Next, Pipeline, PipelineBuilder, Stage};
pub use pool::{CachePool, CachePoolFactory, MemoryPool, MemoryPoolFactory, PoolRef};
pub use query::CachedQuery;
pub use result::{QueryOutput, RowIterator, VecRowIterator};
pub use row::{ResultSet, Row};
pub use service::QueryCacheService;
pub use value::{Collation, Value};

/// QueryCache version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
