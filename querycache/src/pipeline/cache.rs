// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache-or-execute stage

use super::{Next, Stage, CACHE_STAGE};
use crate::args::QueryArgs;
use crate::config::KeyValueConfig;
use crate::error::ExecutorError;
use crate::events::CacheEvent;
use crate::keys::KeyMatch;
use crate::pool::PoolRef;
use crate::query::CachedQuery;
use crate::result::QueryOutput;

/// Serves point reads from the key-value pool when the table has a
/// canonical lookup query and the point key is derivable, and everything
/// else from the table's general pool. Misses are filled from the rest of
/// the chain and stored as materialised rows.
///
/// A key-value entry is only ever filled by the lookup query, so reads
/// with different projections of one entity never share rows. Tables
/// without a lookup query cache point reads under their general key.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStage;

impl Stage for CacheStage {
    fn name(&self) -> &str {
        CACHE_STAGE
    }

    fn handle(&self, call: &CachedQuery<'_>, next: Next<'_>) -> Result<QueryOutput, ExecutorError> {
        if !call.is_cacheable() {
            next.report(CacheEvent::Bypassed {
                query: call.query().to_string(),
            });
            return next.run(call);
        }

        if let Some(kv) = call.key_value() {
            if let (Some(lookup), Some(key)) = (
                kv.rewritten_query.as_deref(),
                call.key_value_key(KeyMatch::Exact),
            ) {
                if let Some(args) = lookup_arguments(kv, lookup, call, next) {
                    match call.rewrite(lookup, &args) {
                        Ok(rewritten) => {
                            return lookup_or_fill(&kv.cache_pool, key, call, &rewritten, next)
                        }
                        Err(e) => next.report(CacheEvent::ConfigurationSkipped {
                            query: lookup.to_string(),
                            reason: e.to_string(),
                        }),
                    }
                }
            }
        }

        let key = call.general_key();
        lookup_or_fill(&call.table().cache_pool, key, call, call, next)
    }
}

/// Bind the lookup query's arguments from the caller's named arguments.
fn lookup_arguments(
    kv: &KeyValueConfig,
    lookup: &str,
    call: &CachedQuery<'_>,
    next: Next<'_>,
) -> Option<QueryArgs> {
    match call.named_arguments().select(&kv.rewritten_args) {
        Ok(named) => Some(QueryArgs::from(named)),
        Err(missing) => {
            next.report(CacheEvent::ConfigurationSkipped {
                query: lookup.to_string(),
                reason: format!("argument '{}' is not bound", missing),
            });
            None
        }
    }
}

/// Look `key` up in the pool, filling a miss by running `fill` through the
/// rest of the chain. Pool failures fall through to the caller's query.
fn lookup_or_fill(
    pool_ref: &PoolRef,
    key: String,
    call: &CachedQuery<'_>,
    fill: &CachedQuery<'_>,
    next: Next<'_>,
) -> Result<QueryOutput, ExecutorError> {
    let pool = match next.pools().get(pool_ref) {
        Ok(pool) => pool,
        Err(error) => {
            next.report(CacheEvent::PoolUnavailable {
                bin: pool_ref.bin.clone(),
                error,
            });
            return next.run(call);
        }
    };

    match pool.get_multiple(std::slice::from_ref(&key)) {
        Ok(mut found) => {
            if let Some(rows) = found.remove(&key) {
                next.report(CacheEvent::Hit {
                    bin: pool_ref.bin.clone(),
                    key,
                });
                return Ok(QueryOutput::Rows(rows));
            }
            next.report(CacheEvent::Miss {
                bin: pool_ref.bin.clone(),
                key: key.clone(),
            });
        }
        Err(error) => {
            next.report(CacheEvent::PoolUnavailable {
                bin: pool_ref.bin.clone(),
                error,
            });
            return next.run(call);
        }
    }

    if fill.query() != call.query() {
        log::debug!("Filling key-value miss with '{}'", fill.query());
    }
    let output = next.run(fill)?.materialize()?;

    if let QueryOutput::Rows(rows) = &output {
        match pool.set(&key, rows.clone(), &pool_ref.entry_options()) {
            Ok(()) => next.report(CacheEvent::Stored {
                bin: pool_ref.bin.clone(),
                key,
                rows: rows.len(),
            }),
            Err(error) => next.report(CacheEvent::PoolUnavailable {
                bin: pool_ref.bin.clone(),
                error,
            }),
        }
    }

    Ok(output)
}
