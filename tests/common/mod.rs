#![allow(dead_code)]
//! Scripted backing store for driving the tail reader step by step.

use bson::{Document as BsonDocument, doc};
use cappedlite::errors::DbError;
use cappedlite::query::QueryDescriptor;
use cappedlite::store::{CappedStore, ReadHandle};
use cappedlite::types::DocumentId;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted answer of a handle's `try_next`.
#[derive(Debug, Clone)]
pub enum Step {
    Record(BsonDocument),
    /// No data within the wait window; the handle stays alive.
    Empty,
    Fail(String),
}

/// What a handle does once its steps run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    Dead,
    Idle,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub steps: Vec<Step>,
    pub end: End,
}

impl Script {
    pub fn records(docs: &[BsonDocument], end: End) -> Self {
        Self { steps: docs.iter().cloned().map(Step::Record).collect(), end }
    }
}

#[derive(Default)]
struct Counters {
    open_now: AtomicUsize,
    max_open: AtomicUsize,
    closes: AtomicUsize,
}

/// `CappedStore` whose handles replay one `Script` per open, in order.
///
/// Once the scripts run out every further open gets an idle handle. Each idle or
/// empty pull sleeps for `wait`, standing in for the store's await window.
#[derive(Clone)]
pub struct ScriptedStore {
    capped: bool,
    wait: Duration,
    scripts: Arc<Mutex<VecDeque<Script>>>,
    opened_with: Arc<Mutex<Vec<QueryDescriptor>>>,
    capped_checks: Arc<AtomicUsize>,
    open_attempts: Arc<AtomicUsize>,
    fail_open_at: Option<usize>,
    counters: Arc<Counters>,
}

impl ScriptedStore {
    pub fn capped(scripts: Vec<Script>) -> Self {
        Self {
            capped: true,
            wait: Duration::from_millis(10),
            scripts: Arc::new(Mutex::new(scripts.into())),
            opened_with: Arc::default(),
            capped_checks: Arc::default(),
            open_attempts: Arc::default(),
            fail_open_at: None,
            counters: Arc::default(),
        }
    }

    pub fn not_capped() -> Self {
        Self { capped: false, ..Self::capped(Vec::new()) }
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// Make the `n`th open (1-based) fail with `StoreUnavailable`.
    pub fn failing_open(mut self, n: usize) -> Self {
        self.fail_open_at = Some(n);
        self
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Descriptors passed to every `open_tailable`, in call order.
    pub fn opened_with(&self) -> Vec<QueryDescriptor> {
        self.opened_with.lock().clone()
    }

    pub fn opens(&self) -> usize {
        self.opened_with.lock().len()
    }

    /// Every call to `open_tailable`, failed ones included.
    pub fn open_attempts(&self) -> usize {
        self.open_attempts.load(Ordering::SeqCst)
    }

    pub fn capped_checks(&self) -> usize {
        self.capped_checks.load(Ordering::SeqCst)
    }

    pub fn open_now(&self) -> usize {
        self.counters.open_now.load(Ordering::SeqCst)
    }

    pub fn max_open(&self) -> usize {
        self.counters.max_open.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.counters.closes.load(Ordering::SeqCst)
    }
}

impl CappedStore for ScriptedStore {
    type Handle = ScriptedHandle;

    fn is_capped(&self, _collection: &str) -> Result<bool, DbError> {
        self.capped_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.capped)
    }

    fn open_tailable(
        &self,
        _collection: &str,
        query: &QueryDescriptor,
    ) -> Result<ScriptedHandle, DbError> {
        let attempt = self.open_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_open_at == Some(attempt) {
            return Err(DbError::StoreUnavailable(format!("open #{attempt} refused")));
        }
        self.opened_with.lock().push(query.clone());
        let script = self
            .scripts
            .lock()
            .pop_front()
            .unwrap_or(Script { steps: Vec::new(), end: End::Idle });
        let now = self.counters.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_open.fetch_max(now, Ordering::SeqCst);
        Ok(ScriptedHandle {
            steps: script.steps.into(),
            end: script.end,
            alive: true,
            closed: false,
            wait: self.wait,
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct ScriptedHandle {
    steps: VecDeque<Step>,
    end: End,
    alive: bool,
    closed: bool,
    wait: Duration,
    counters: Arc<Counters>,
}

impl ReadHandle for ScriptedHandle {
    fn try_next(&mut self) -> Result<Option<BsonDocument>, DbError> {
        assert!(!self.closed, "pull on a closed handle");
        match self.steps.pop_front() {
            Some(Step::Record(d)) => Ok(Some(d)),
            Some(Step::Empty) => {
                std::thread::sleep(self.wait);
                Ok(None)
            }
            Some(Step::Fail(msg)) => Err(DbError::StoreUnavailable(msg)),
            None if self.end == End::Dead => {
                self.alive = false;
                Ok(None)
            }
            None => {
                std::thread::sleep(self.wait);
                Ok(None)
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive && !self.closed
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.open_now.fetch_sub(1, Ordering::SeqCst);
            self.counters.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// `n` records with strictly increasing ids, `{"_id": .., "n": i}` for `i` in `1..=n`.
pub fn docs(n: u64) -> Vec<BsonDocument> {
    (1..=n)
        .map(|i| doc! {"_id": DocumentId::from_parts(1_700_000_000, i), "n": i as i64})
        .collect()
}
