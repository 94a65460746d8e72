// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory post-processing of result sets
//!
//! A map-reduce query is answered from a broader cached query; the
//! [`FilterSpec`] narrows those rows back down. Steps run in the fixed order
//! where → order → select, and each step is skipped when not configured.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::args::NamedArguments;
use crate::error::ConfigurationError;
use crate::row::{ResultSet, Row};
use crate::value::{Collation, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One equality condition of a `where` step
#[derive(Debug, Clone, PartialEq)]
pub enum WhereCondition {
    /// Column must equal a literal
    Equals { column: String, value: Value },
    /// Column must equal the call's argument of the same name
    Argument { column: String },
}

impl WhereCondition {
    pub fn column(&self) -> &str {
        match self {
            WhereCondition::Equals { column, .. } | WhereCondition::Argument { column } => column,
        }
    }
}

/// One sort key of an `order` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderKey {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub collation: Collation,
}

impl OrderKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
            collation: Collation::Binary,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            direction: Direction::Desc,
            ..Self::asc(column)
        }
    }

    #[must_use]
    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }
}

/// Filter / order / project specification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub conditions: Vec<WhereCondition>,
    pub order: Vec<OrderKey>,
    pub select: Option<Vec<String>>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.order.is_empty() && self.select.is_none()
    }

    /// Resolve argument-bound conditions against the call's arguments.
    pub fn bind(&self, args: &NamedArguments) -> Result<BoundFilter<'_>, ConfigurationError> {
        let mut conditions = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let value = match condition {
                WhereCondition::Equals { value, .. } => value.clone(),
                WhereCondition::Argument { column } => args
                    .get(column)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::MissingArgument(column.clone()))?,
            };
            conditions.push((condition.column(), value));
        }

        Ok(BoundFilter {
            conditions,
            order: &self.order,
            select: self.select.as_deref(),
        })
    }
}

/// A [`FilterSpec`] with every condition resolved to a concrete value
#[derive(Debug)]
pub struct BoundFilter<'a> {
    conditions: Vec<(&'a str, Value)>,
    order: &'a [OrderKey],
    select: Option<&'a [String]>,
}

impl<'a> BoundFilter<'a> {
    /// Apply where → order → select
    pub fn apply(&self, rows: ResultSet) -> ResultSet {
        let mut rows: ResultSet = if self.conditions.is_empty() {
            rows
        } else {
            rows.into_iter().filter(|row| self.matches(row)).collect()
        };

        if !self.order.is_empty() {
            // sort_by is stable: rows equal on every key keep their order
            rows.sort_by(|a, b| compare_rows(a, b, self.order));
        }

        match self.select {
            Some(columns) => rows.iter().map(|row| row.project(columns)).collect(),
            None => rows,
        }
    }

    fn matches(&self, row: &Row) -> bool {
        self.conditions.iter().all(|(column, expected)| {
            row.get(column)
                .map_or(false, |actual| actual.loose_eq(expected))
        })
    }
}

fn compare_rows(a: &Row, b: &Row, order: &[OrderKey]) -> Ordering {
    for key in order {
        let left = a.get(&key.column).unwrap_or(&Value::Null);
        let right = b.get(&key.column).unwrap_or(&Value::Null);
        let ord = left.compare(right, key.collation);
        let ord = match key.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
