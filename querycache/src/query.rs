// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-call view of a query against its table configuration

use std::sync::Arc;

use crate::args::{NamedArguments, QueryArgs, QueryOptions};
use crate::classifier::{classify, QueryVerb};
use crate::config::{
    CacheConfiguration, KeyValueConfig, MapReduceSpec, QueryOverride, TableConfiguration,
};
use crate::error::ConfigurationError;
use crate::keys::{general_key, key_value_key, resolve_argument_names, KeyMatch};

/// One query call bound to the table configuration it runs under.
///
/// Argument names are resolved once, here, so key derivation, map-reduce
/// rebinding and filters all agree on which value a name denotes.
#[derive(Debug, Clone)]
pub struct CachedQuery<'a> {
    query: &'a str,
    args: &'a QueryArgs,
    options: &'a QueryOptions,
    verb: QueryVerb,
    table: &'a TableConfiguration,
    query_override: Option<&'a QueryOverride>,
    named: NamedArguments,
    snapshot: &'a Arc<CacheConfiguration>,
}

impl<'a> CachedQuery<'a> {
    pub fn new(
        query: &'a str,
        args: &'a QueryArgs,
        options: &'a QueryOptions,
        table: &'a TableConfiguration,
        snapshot: &'a Arc<CacheConfiguration>,
    ) -> Result<Self, ConfigurationError> {
        let query_override = table.query_override(query);
        let names = query_override.and_then(|o| o.argument_names.as_deref());
        let named = resolve_argument_names(args, names)?;

        Ok(Self {
            query,
            args,
            options,
            verb: classify(query),
            table,
            query_override,
            named,
            snapshot,
        })
    }

    /// The same call aimed at a different query text and arguments, under
    /// the same table and snapshot
    pub fn rewrite<'b>(
        &self,
        query: &'b str,
        args: &'b QueryArgs,
    ) -> Result<CachedQuery<'b>, ConfigurationError>
    where
        'a: 'b,
    {
        CachedQuery::new(query, args, self.options, self.table, self.snapshot)
    }

    pub fn query(&self) -> &'a str {
        self.query
    }

    pub fn args(&self) -> &'a QueryArgs {
        self.args
    }

    pub fn options(&self) -> &'a QueryOptions {
        self.options
    }

    pub fn verb(&self) -> QueryVerb {
        self.verb
    }

    pub fn table(&self) -> &'a TableConfiguration {
        self.table
    }

    pub fn query_override(&self) -> Option<&'a QueryOverride> {
        self.query_override
    }

    pub fn named_arguments(&self) -> &NamedArguments {
        &self.named
    }

    pub(crate) fn snapshot(&self) -> &'a Arc<CacheConfiguration> {
        self.snapshot
    }

    /// Per-query override first, table default otherwise
    pub fn is_cacheable(&self) -> bool {
        self.query_override
            .map_or(self.table.cache_all_queries, |o| o.cacheable)
    }

    pub fn test_sample_rate(&self) -> u8 {
        self.query_override
            .and_then(|o| o.test_sample_rate)
            .unwrap_or(self.table.test_sample_rate)
    }

    pub fn map_reduce(&self) -> Option<&'a MapReduceSpec> {
        self.query_override.and_then(|o| o.map_reduce.as_ref())
    }

    /// Key-value settings, unless the table is plain or this query opted out
    pub fn key_value(&self) -> Option<&'a KeyValueConfig> {
        if self.query_override.map_or(false, |o| !o.key_value) {
            return None;
        }
        self.table.key_value()
    }

    pub fn general_key(&self) -> String {
        general_key(self.table, self.query, &self.named)
    }

    pub fn key_value_key(&self, mode: KeyMatch) -> Option<String> {
        self.key_value()
            .and_then(|kv| key_value_key(self.table, kv, &self.named, mode))
    }
}
