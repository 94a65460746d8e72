// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query classification
//!
//! The cache does not parse SQL. It only needs the command verb, to tell
//! reads from writes, and the single `{table}` marker embedded in the query
//! text, to find the table configuration.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static TABLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^{}]+)\}").expect("table marker pattern is valid")
});

/// Command verb of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryVerb {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl QueryVerb {
    /// Create/update/delete verbs, which trigger invalidation
    pub fn is_mutating(&self) -> bool {
        matches!(self, QueryVerb::Insert | QueryVerb::Update | QueryVerb::Delete)
    }

    pub fn is_read(&self) -> bool {
        matches!(self, QueryVerb::Select)
    }
}

impl fmt::Display for QueryVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryVerb::Select => "SELECT",
            QueryVerb::Insert => "INSERT",
            QueryVerb::Update => "UPDATE",
            QueryVerb::Delete => "DELETE",
            QueryVerb::Other => "OTHER",
        };
        write!(f, "{}", name)
    }
}

/// Classify a query by its first whitespace-delimited token
pub fn classify(query: &str) -> QueryVerb {
    let verb = query.split_whitespace().next().unwrap_or("");
    match verb.to_ascii_uppercase().as_str() {
        "SELECT" => QueryVerb::Select,
        "INSERT" => QueryVerb::Insert,
        "UPDATE" => QueryVerb::Update,
        "DELETE" => QueryVerb::Delete,
        _ => QueryVerb::Other,
    }
}

/// Extract the table named by the query's `{table}` marker.
///
/// Returns `None` unless the query carries exactly one marker.
pub fn extract_table_identifier(query: &str) -> Option<&str> {
    if query.matches('{').count() != 1 {
        return None;
    }
    TABLE_MARKER
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
}

/// Canonical form of a query text used to look up per-query overrides:
/// trimmed, with whitespace runs collapsed to one space.
pub fn normalize_query_text(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}
