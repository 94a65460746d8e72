// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query outputs and lazy row streams
//!
//! Executors may return rows eagerly, as a lazy stream, or as an opaque
//! non-row result (affected row counts and the like). The cache only ever
//! stores materialised row sets, so streams are drained through
//! [`QueryOutput::materialize`] before they are compared or cached.

use std::fmt;

use crate::error::ExecutorError;
use crate::row::{ResultSet, Row};
use crate::value::Value;

/// Iterator trait for lazily produced rows
pub trait RowIterator: Iterator<Item = Result<Row, ExecutorError>> + Send {
    /// Get estimated row count if known
    ///
    /// Used to pre-allocate when the stream is materialised. Returns `None`
    /// if the count cannot be determined without scanning.
    fn size_hint_rows(&self) -> Option<usize> {
        None
    }
}

/// Iterator wrapper for `Vec<Row>`
pub struct VecRowIterator {
    rows: std::vec::IntoIter<Row>,
    count: usize,
}

impl VecRowIterator {
    pub fn new(rows: Vec<Row>) -> Self {
        let count = rows.len();
        Self {
            rows: rows.into_iter(),
            count,
        }
    }
}

impl Iterator for VecRowIterator {
    type Item = Result<Row, ExecutorError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl RowIterator for VecRowIterator {
    fn size_hint_rows(&self) -> Option<usize> {
        Some(self.count)
    }
}

/// Output of a query call
pub enum QueryOutput {
    /// Materialised rows
    Rows(ResultSet),
    /// Rows still to be pulled from the executor
    Stream(Box<dyn RowIterator>),
    /// Non-row result, passed through untouched
    Opaque(Value),
}

impl QueryOutput {
    /// Wrap a lazy row iterator
    pub fn stream<I>(iter: I) -> Self
    where
        I: RowIterator + 'static,
    {
        QueryOutput::Stream(Box::new(iter))
    }

    /// Drain any stream into a concrete, finite row set.
    ///
    /// The first stream error aborts materialisation and is returned.
    pub fn materialize(self) -> Result<QueryOutput, ExecutorError> {
        match self {
            QueryOutput::Stream(iter) => {
                let mut rows = Vec::with_capacity(iter.size_hint_rows().unwrap_or(0));
                for row in iter {
                    rows.push(row?);
                }
                Ok(QueryOutput::Rows(rows))
            }
            other => Ok(other),
        }
    }

    pub fn is_rows(&self) -> bool {
        matches!(self, QueryOutput::Rows(_))
    }

    /// Borrow materialised rows, if this output holds any
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Take materialised rows, if this output holds any
    pub fn into_rows(self) -> Option<ResultSet> {
        match self {
            QueryOutput::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

impl PartialEq for QueryOutput {
    /// Streams never compare equal; materialise first.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (QueryOutput::Rows(a), QueryOutput::Rows(b)) => a == b,
            (QueryOutput::Opaque(a), QueryOutput::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutput::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
            QueryOutput::Stream(iter) => f
                .debug_struct("Stream")
                .field("size_hint_rows", &iter.size_hint_rows())
                .finish(),
            QueryOutput::Opaque(value) => f.debug_tuple("Opaque").field(value).finish(),
        }
    }
}

impl From<ResultSet> for QueryOutput {
    fn from(rows: ResultSet) -> Self {
        QueryOutput::Rows(rows)
    }
}
