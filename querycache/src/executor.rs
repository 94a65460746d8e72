// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Underlying query executor interface

use crate::args::{QueryArgs, QueryOptions};
use crate::error::ExecutorError;
use crate::result::QueryOutput;

/// The relational executor the cache sits in front of.
///
/// For read queries the executor must return a finite sequence of rows,
/// either materialised or as a [`RowIterator`](crate::result::RowIterator)
/// stream. Any other output is treated as an opaque pass-through value.
pub trait QueryExecutor: Send + Sync {
    fn query(
        &self,
        query: &str,
        args: &QueryArgs,
        options: &QueryOptions,
    ) -> Result<QueryOutput, ExecutorError>;
}
