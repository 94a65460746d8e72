// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Map-reduce stage: answer a narrow query from a broader cached one

use super::{Next, Stage, MAP_REDUCE_STAGE};
use crate::args::QueryArgs;
use crate::error::ExecutorError;
use crate::events::CacheEvent;
use crate::query::CachedQuery;
use crate::result::QueryOutput;

/// Runs the configured source query through the service's outer entry point,
/// so it is classified and cached on its own, then filters its rows down to
/// what the caller's query asked for.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapReduceStage;

impl Stage for MapReduceStage {
    fn name(&self) -> &str {
        MAP_REDUCE_STAGE
    }

    fn handle(&self, call: &CachedQuery<'_>, next: Next<'_>) -> Result<QueryOutput, ExecutorError> {
        let spec = match call.map_reduce() {
            Some(spec) => spec,
            None => return next.run(call),
        };

        let source_args = match call.named_arguments().select(&spec.source_args) {
            Ok(named) => QueryArgs::from(named),
            Err(missing) => {
                next.report(CacheEvent::ConfigurationSkipped {
                    query: call.query().to_string(),
                    reason: format!("source argument '{}' is not bound", missing),
                });
                return next.run(call);
            }
        };

        let filter = match spec.filter.bind(call.named_arguments()) {
            Ok(filter) => filter,
            Err(e) => {
                next.report(CacheEvent::ConfigurationSkipped {
                    query: call.query().to_string(),
                    reason: e.to_string(),
                });
                return next.run(call);
            }
        };

        log::debug!(
            "Answering '{}' from source query '{}'",
            call.query(),
            spec.source_query
        );
        let output = next
            .dispatch(call.snapshot(), &spec.source_query, &source_args, call.options())?
            .materialize()?;

        Ok(match output {
            QueryOutput::Rows(rows) => QueryOutput::Rows(filter.apply(rows)),
            other => other,
        })
    }
}
