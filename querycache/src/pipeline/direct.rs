// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Terminal stage

use super::{Next, Stage, FINAL_STAGE};
use crate::error::ExecutorError;
use crate::query::CachedQuery;
use crate::result::QueryOutput;

/// Runs the call against the executor; never delegates
#[derive(Debug, Default, Clone, Copy)]
pub struct FinalStage;

impl Stage for FinalStage {
    fn name(&self) -> &str {
        FINAL_STAGE
    }

    fn handle(&self, call: &CachedQuery<'_>, next: Next<'_>) -> Result<QueryOutput, ExecutorError> {
        next.execute_direct(call)
    }
}
