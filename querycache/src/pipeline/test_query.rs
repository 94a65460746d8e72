// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Consistency self-test stage

use super::{Next, Stage, TEST_QUERY_STAGE};
use crate::config::MAX_SAMPLE_RATE;
use crate::error::ExecutorError;
use crate::events::{CacheEvent, ConsistencyFault};
use crate::query::CachedQuery;
use crate::result::QueryOutput;

/// Compares a sample of pipeline results against direct executor reads.
///
/// A mismatch is only a fault when a second direct read agrees with the
/// first: if the data moved between the two direct reads, a concurrent
/// write explains the difference and the mismatch is dropped. The
/// pipeline's own result is always what the caller gets, and a failed
/// direct read only abandons the comparison.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestQueryStage;

impl Stage for TestQueryStage {
    fn name(&self) -> &str {
        TEST_QUERY_STAGE
    }

    fn handle(&self, call: &CachedQuery<'_>, next: Next<'_>) -> Result<QueryOutput, ExecutorError> {
        if !sampled(call.test_sample_rate()) {
            return next.run(call);
        }

        let baseline = match direct_read(call, next) {
            Ok(baseline) => baseline,
            Err(e) => {
                log::warn!("Self-test baseline for '{}' failed: {}", call.query(), e);
                return next.run(call);
            }
        };
        let served = next.run(call)?.materialize()?;

        if served == baseline {
            next.report(CacheEvent::SelfTestPassed {
                query: call.query().to_string(),
            });
            return Ok(served);
        }

        let second = match direct_read(call, next) {
            Ok(second) => second,
            Err(e) => {
                log::warn!(
                    "Self-test second baseline for '{}' failed: {}",
                    call.query(),
                    e
                );
                return Ok(served);
            }
        };
        if second == baseline {
            next.report(CacheEvent::ConsistencyFault(ConsistencyFault {
                table: call.table().name.clone(),
                query: call.query().to_string(),
                served_rows: served.rows().map(|rows| rows.len()),
                direct_rows: baseline.rows().map(|rows| rows.len()),
            }));
        } else {
            next.report(CacheEvent::BenignRace {
                query: call.query().to_string(),
            });
        }

        Ok(served)
    }
}

fn direct_read(call: &CachedQuery<'_>, next: Next<'_>) -> Result<QueryOutput, ExecutorError> {
    next.execute_direct(call)?.materialize()
}

/// One uniform draw over `1..=100` per call
fn sampled(rate: u8) -> bool {
    rate > 0 && fastrand::u8(1..=MAX_SAMPLE_RATE) <= rate
}
