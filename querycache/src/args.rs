// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query arguments and options as handed in by callers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// Key an argument was supplied under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgKey {
    /// Positional placeholder (`?`), zero-based
    Position(usize),
    /// Named placeholder (`:name`)
    Name(String),
}

impl fmt::Display for ArgKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgKey::Position(i) => write!(f, "{}", i),
            ArgKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Ordered argument list; may mix positional and named entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryArgs {
    entries: Vec<(ArgKey, Value)>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positional arguments, keyed `0..n`
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            entries: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (ArgKey::Position(i), v.into()))
                .collect(),
        }
    }

    /// Named arguments in the given order
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (ArgKey::Name(k.into()), v.into()))
                .collect(),
        }
    }

    /// Append an argument under an explicit key
    pub fn push(&mut self, key: ArgKey, value: impl Into<Value>) {
        self.entries.push((key, value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(ArgKey, Value)> {
        self.entries.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl From<NamedArguments> for QueryArgs {
    fn from(named: NamedArguments) -> Self {
        Self::named(named.entries)
    }
}

/// Opaque per-call executor options, passed through untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions(BTreeMap<String, Value>);

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Arguments bound to resolved names, in resolution order.
///
/// Names are unique; construction is owned by
/// [`resolve_argument_names`](crate::keys::resolve_argument_names).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedArguments {
    entries: Vec<(String, Value)>,
}

impl NamedArguments {
    pub(crate) fn from_unique(entries: Vec<(String, Value)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Pick the given names, in the given order, as a new binding.
    ///
    /// Returns the first missing name on failure.
    pub fn select(&self, names: &[String]) -> Result<NamedArguments, String> {
        let mut picked = Vec::with_capacity(names.len());
        for name in names {
            match self.get(name) {
                Some(value) => picked.push((name.clone(), value.clone())),
                None => return Err(name.clone()),
            }
        }
        Ok(NamedArguments::from_unique(picked))
    }
}
