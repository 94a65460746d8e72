// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key derivation
//!
//! Two key spaces exist side by side:
//! - the general key, `query:<prefix..>:<query text>:<name>=<value>..`,
//!   which namespaces the whole result set of one query call
//! - the key-value key, `kv:<prefix..>:<column>=<value>..`, which namespaces
//!   one entity addressed by its primary key
//!
//! Every fragment is escaped, so distinct inputs never share a key.

use crate::args::{ArgKey, NamedArguments, QueryArgs};
use crate::config::{KeyValueConfig, TableConfiguration};
use crate::error::ConfigurationError;
use crate::value::escape_fragment;

/// Namespace tag of general query keys
pub const QUERY_KEY_TAG: &str = "query";

/// Namespace tag of key-value (point) keys
pub const KEY_VALUE_KEY_TAG: &str = "kv";

/// Separator between key segments
pub const KEY_SEPARATOR: &str = ":";

/// How strictly bound arguments must match the key columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMatch {
    /// Bound arguments are exactly the key columns. Used for reads, where
    /// an extra predicate would make the point entry the wrong answer.
    Exact,
    /// Bound arguments include every key column. Used for invalidation,
    /// where a write touching `id = 5` must evict `id = 5` regardless of
    /// what else it sets.
    Covering,
}

/// Bind argument values to names.
///
/// Explicit `names` are zipped positionally with the values and must match
/// them in number. Without names, positional arguments become `arg_<index>`
/// and named arguments keep their name. Names must come out unique.
pub fn resolve_argument_names(
    args: &QueryArgs,
    names: Option<&[String]>,
) -> Result<NamedArguments, ConfigurationError> {
    let resolved: Vec<(String, crate::Value)> = match names {
        Some(names) => {
            if names.len() != args.len() {
                return Err(ConfigurationError::ArgumentCount {
                    expected: names.len(),
                    actual: args.len(),
                });
            }
            names.iter().cloned().zip(args.values().cloned()).collect()
        }
        None => args
            .iter()
            .map(|(key, value)| {
                let name = match key {
                    ArgKey::Position(i) => format!("arg_{}", i),
                    ArgKey::Name(name) => name.clone(),
                };
                (name, value.clone())
            })
            .collect(),
    };

    for (i, (name, _)) in resolved.iter().enumerate() {
        if resolved[..i].iter().any(|(earlier, _)| earlier == name) {
            return Err(ConfigurationError::DuplicateArgument(name.clone()));
        }
    }

    Ok(NamedArguments::from_unique(resolved))
}

/// General key for one query call
pub fn general_key(table: &TableConfiguration, query: &str, args: &NamedArguments) -> String {
    let mut segments = Vec::with_capacity(2 + table.cache_key_prefix.len() + args.len());
    segments.push(QUERY_KEY_TAG.to_string());
    segments.extend(table.cache_key_prefix.iter().map(|part| escape_fragment(part)));
    segments.push(escape_fragment(query));

    for (name, value) in args.iter() {
        segments.push(format!("{}={}", escape_fragment(name), value.key_fragment()));
    }

    segments.join(KEY_SEPARATOR)
}

/// Key-value key for the entity the arguments address.
///
/// Returns `None` when a key column is unbound, or, under
/// [`KeyMatch::Exact`], when arguments other than the key columns are bound.
pub fn key_value_key(
    table: &TableConfiguration,
    kv: &KeyValueConfig,
    args: &NamedArguments,
    mode: KeyMatch,
) -> Option<String> {
    if kv.key_columns.is_empty() {
        return None;
    }
    if mode == KeyMatch::Exact && args.len() != kv.key_columns.len() {
        return None;
    }

    let mut segments = Vec::with_capacity(1 + table.cache_key_prefix.len() + kv.key_columns.len());
    segments.push(KEY_VALUE_KEY_TAG.to_string());
    segments.extend(table.cache_key_prefix.iter().map(|part| escape_fragment(part)));

    for column in &kv.key_columns {
        let value = args.get(column)?;
        segments.push(format!("{}={}", escape_fragment(column), value.key_fragment()));
    }

    Some(segments.join(KEY_SEPARATOR))
}
