//! Test utilities for QueryCache integration tests
//!
//! - RecordingExecutor: scripted executor counting calls per query text
//! - RecordingObserver: collects every cache event
//! - CacheFixture: a service wired to both, over in-memory pools

#![allow(dead_code)]

pub mod fixture;
pub mod recording;

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
