// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Result rows

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::value::Value;

/// Materialised result of a read query
pub type ResultSet = Vec<Row>;

/// A single result row: column name to value, remembering column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Column names in the order the executor produced them
    pub columns: Vec<String>,
    /// Column values by name
    pub values: HashMap<String, Value>,
}

impl Row {
    /// Create a new empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row from ordered `(column, value)` pairs.
    ///
    /// A repeated column keeps its first position and its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut row = Self::new();
        for (column, value) in pairs {
            row.set(column, value);
        }
        row
    }

    /// Set a column value, appending the column if it is new
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        if !self.values.contains_key(&column) {
            self.columns.push(column.clone());
        }
        self.values.insert(column, value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate `(column, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .filter_map(|column| self.values.get(column).map(|v| (column.as_str(), v)))
    }

    /// Keep exactly the given columns, in the given order.
    ///
    /// Columns the row does not carry are skipped rather than invented.
    pub fn project(&self, columns: &[String]) -> Row {
        let mut projected = Row::new();
        for column in columns {
            if let Some(value) = self.values.get(column) {
                projected.set(column.clone(), value.clone());
            }
        }
        projected
    }
}
