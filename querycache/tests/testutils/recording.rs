//! Scripted executor and event recorder

use parking_lot::Mutex;
use querycache::{
    CacheEvent, CacheObserver, ExecutorError, QueryArgs, QueryExecutor, QueryOptions, QueryOutput,
    ResultSet, Row, Value, VecRowIterator,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// One scripted executor answer
#[derive(Debug, Clone)]
pub enum Response {
    Rows(ResultSet),
    /// Rows handed out lazily through a row iterator
    Stream(ResultSet),
    Opaque(Value),
    Fail(ExecutorError),
}

impl Response {
    fn into_output(self) -> Result<QueryOutput, ExecutorError> {
        match self {
            Response::Rows(rows) => Ok(QueryOutput::Rows(rows)),
            Response::Stream(rows) => Ok(QueryOutput::stream(VecRowIterator::new(rows))),
            Response::Opaque(value) => Ok(QueryOutput::Opaque(value)),
            Response::Fail(error) => Err(error),
        }
    }
}

#[derive(Default)]
struct Script {
    queued: VecDeque<Response>,
    fallback: Option<Response>,
}

/// Executor answering from per-query scripts. Queued answers are used
/// first, then the fallback; unscripted queries return no rows.
#[derive(Default)]
pub struct RecordingExecutor {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, QueryArgs)>>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `query` with `response` whenever nothing is queued
    pub fn respond(&self, query: &str, response: Response) {
        self.scripts
            .lock()
            .entry(query.to_string())
            .or_default()
            .fallback = Some(response);
    }

    pub fn respond_rows(&self, query: &str, rows: ResultSet) {
        self.respond(query, Response::Rows(rows));
    }

    /// Answer the next calls of `query` in order
    pub fn queue(&self, query: &str, responses: Vec<Response>) {
        self.scripts
            .lock()
            .entry(query.to_string())
            .or_default()
            .queued
            .extend(responses);
    }

    pub fn calls_for(&self, query: &str) -> usize {
        self.calls.lock().iter().filter(|(q, _)| q == query).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn last_args(&self, query: &str) -> Option<QueryArgs> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|(q, _)| q == query)
            .map(|(_, args)| args.clone())
    }
}

impl QueryExecutor for RecordingExecutor {
    fn query(
        &self,
        query: &str,
        args: &QueryArgs,
        _options: &QueryOptions,
    ) -> Result<QueryOutput, ExecutorError> {
        self.calls.lock().push((query.to_string(), args.clone()));

        let response = {
            let mut scripts = self.scripts.lock();
            scripts.get_mut(query).and_then(|script| {
                script
                    .queued
                    .pop_front()
                    .or_else(|| script.fallback.clone())
            })
        };
        response
            .unwrap_or_else(|| Response::Rows(Vec::new()))
            .into_output()
    }
}

/// Observer keeping every event it sees
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<CacheEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CacheEvent> {
        self.events.lock().clone()
    }

    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CacheEvent) -> bool,
    {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn faults(&self) -> usize {
        self.count(|e| matches!(e, CacheEvent::ConsistencyFault(_)))
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl CacheObserver for RecordingObserver {
    fn on_event(&self, event: &CacheEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Row built from `(column, value)` pairs
pub fn row<const N: usize>(pairs: [(&str, Value); N]) -> Row {
    Row::from_pairs(pairs)
}
