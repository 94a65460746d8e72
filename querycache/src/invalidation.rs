// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Invalidation after mutating queries
//!
//! The general pool of a table is always cleared whole: the keys of cached
//! SELECTs cannot be enumerated from a write's arguments. On key-value
//! tables the point entry is deleted when the write binds every key column;
//! an UPDATE or DELETE that does not is assumed to touch any entity and
//! clears the key-value pool too. An INSERT without a point key cannot have
//! a cached point entry, so the key-value step is skipped.

use crate::args::NamedArguments;
use crate::classifier::QueryVerb;
use crate::config::TableConfiguration;
use crate::events::{CacheEvent, EventSink};
use crate::keys::{key_value_key, KeyMatch};
use crate::pool::{CachePoolFactory, PoolRef};

/// Pool operations one mutating query calls for, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Point entry to delete from the key-value pool
    pub delete: Option<(PoolRef, String)>,
    /// Pools to clear entirely
    pub clear: Vec<PoolRef>,
}

impl InvalidationPlan {
    /// Plan for a mutating `verb` on `table`. `args` is `None` when the call's
    /// argument names could not be resolved.
    pub fn for_write(
        table: &TableConfiguration,
        verb: QueryVerb,
        args: Option<&NamedArguments>,
    ) -> Self {
        let mut plan = InvalidationPlan {
            delete: None,
            clear: Vec::with_capacity(2),
        };

        if let Some(kv) = table.key_value() {
            match args.and_then(|named| key_value_key(table, kv, named, KeyMatch::Covering)) {
                Some(key) => plan.delete = Some((kv.cache_pool.clone(), key)),
                None if verb == QueryVerb::Insert => {}
                None => plan.clear.push(kv.cache_pool.clone()),
            }
        }

        plan.clear.push(table.cache_pool.clone());
        plan
    }

    /// Apply the plan. Failures are reported, never returned: the write
    /// already happened and its result still goes back to the caller.
    pub(crate) fn apply(&self, pools: &dyn CachePoolFactory, events: &EventSink) -> bool {
        let mut complete = true;

        if let Some((pool_ref, key)) = &self.delete {
            let outcome = pools
                .get(pool_ref)
                .and_then(|pool| pool.delete_item(key));
            match outcome {
                Ok(()) => events.emit(CacheEvent::KeyInvalidated {
                    bin: pool_ref.bin.clone(),
                    key: key.clone(),
                }),
                Err(error) => {
                    complete = false;
                    events.emit(CacheEvent::InvalidationFailed {
                        bin: pool_ref.bin.clone(),
                        error,
                    });
                }
            }
        }

        for pool_ref in &self.clear {
            match pools.get(pool_ref).and_then(|pool| pool.clear()) {
                Ok(()) => events.emit(CacheEvent::BinCleared {
                    bin: pool_ref.bin.clone(),
                }),
                Err(error) => {
                    complete = false;
                    events.emit(CacheEvent::InvalidationFailed {
                        bin: pool_ref.bin.clone(),
                        error,
                    });
                }
            }
        }

        complete
    }
}
