// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types

use thiserror::Error;

/// Errors raised by the underlying query executor.
///
/// This is the only error kind `QueryCacheService::query` hands back to
/// callers; everything else degrades to uncached execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Result stream error: {0}")]
    Stream(String),
}

/// Malformed or contradictory cache configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid configuration document: {0}")]
    Malformed(String),

    #[error("Table '{table}': {message}")]
    InvalidTable { table: String, message: String },

    #[error("Table '{table}', query '{query}': {message}")]
    InvalidQuery {
        table: String,
        query: String,
        message: String,
    },

    #[error("Query '{query}' is registered for both '{first}' and '{second}'")]
    DuplicateQuery {
        query: String,
        first: String,
        second: String,
    },

    #[error("Map-reduce cycle through query '{0}'")]
    MapReduceCycle(String),

    #[error("{expected} argument names configured but {actual} arguments bound")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("Argument name '{0}' is bound more than once")]
    DuplicateArgument(String),

    #[error("Argument '{0}' is not bound")]
    MissingArgument(String),

    #[error("Pipeline: {0}")]
    Pipeline(String),
}

/// Cache pool failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    #[error("Cache pool '{0}' is unavailable")]
    Unavailable(String),

    #[error("Cache pool '{bin}' operation failed: {message}")]
    Operation { bin: String, message: String },
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(error: serde_json::Error) -> Self {
        ConfigurationError::Malformed(error.to_string())
    }
}
