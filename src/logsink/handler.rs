use super::format::LogFormatter;
use crate::store::RecordSink;
use bson::Document as BsonDocument;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Target prefix of this crate's own log lines; never written back into the store.
const OWN_TARGET_PREFIX: &str = "cappedlite";

pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// `log::Log` implementation that appends every record to a (capped) collection.
///
/// Until the first write succeeds the handler buffers: records that cannot be
/// written are queued, oldest dropped once `capacity` is reached. The first
/// successful write drains the queue and turns buffering off for good; later
/// failures are counted and reported on stderr.
pub struct CappedLogHandler<S: RecordSink> {
    sink: S,
    collection: String,
    formatter: LogFormatter,
    level: log::LevelFilter,
    capacity: usize,
    buffer: Mutex<VecDeque<BsonDocument>>,
    buffering: AtomicBool,
    dropped: AtomicU64,
    failures: AtomicU64,
}

impl<S: RecordSink> std::fmt::Debug for CappedLogHandler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CappedLogHandler")
            .field("collection", &self.collection)
            .field("level", &self.level)
            .field("buffered", &self.buffered())
            .field("buffering", &self.is_buffering())
            .finish_non_exhaustive()
    }
}

impl<S: RecordSink> CappedLogHandler<S> {
    pub fn new(sink: S, collection: impl Into<String>) -> Self {
        Self {
            sink,
            collection: collection.into(),
            formatter: LogFormatter::new(),
            level: log::LevelFilter::Info,
            capacity: DEFAULT_BUFFER_CAPACITY,
            buffer: Mutex::new(VecDeque::new()),
            buffering: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn with_level(mut self, level: log::LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// A zero capacity keeps nothing while buffering.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: LogFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    #[must_use]
    pub const fn level(&self) -> log::LevelFilter {
        self.level
    }

    #[must_use]
    pub fn is_buffering(&self) -> bool {
        self.buffering.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Records discarded because the startup buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Records lost after buffering was turned off.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn enqueue(&self, queue: &mut VecDeque<BsonDocument>, doc: BsonDocument) {
        if self.capacity == 0 {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if queue.len() >= self.capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(doc);
    }

    /// Write `doc`, keeping insertion order with anything still queued.
    fn write(&self, doc: BsonDocument) {
        if self.is_buffering() {
            let mut queue = self.buffer.lock();
            while let Some(front) = queue.pop_front() {
                if self.sink.insert(&self.collection, front.clone()).is_err() {
                    queue.push_front(front);
                    self.enqueue(&mut queue, doc);
                    return;
                }
            }
            match self.sink.insert(&self.collection, doc.clone()) {
                Ok(_) => self.buffering.store(false, Ordering::Release),
                Err(_) => self.enqueue(&mut queue, doc),
            }
            return;
        }
        if let Err(e) = self.sink.insert(&self.collection, doc) {
            self.failures.fetch_add(1, Ordering::Relaxed);
            eprintln!("cappedlite: cannot write log record to {}: {e}", self.collection);
        }
    }
}

impl<S: RecordSink + Send + Sync> log::Log for CappedLogHandler<S> {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.level && !metadata.target().starts_with(OWN_TARGET_PREFIX)
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.write(self.formatter.format(record).to_document());
    }

    fn flush(&self) {
        if self.is_buffering() && self.buffered() > 0 {
            let mut queue = self.buffer.lock();
            while let Some(front) = queue.pop_front() {
                if self.sink.insert(&self.collection, front.clone()).is_err() {
                    queue.push_front(front);
                    return;
                }
                self.buffering.store(false, Ordering::Release);
            }
        }
    }
}

/// Install `handler` as the process-wide logger.
///
/// # Errors
/// Returns `InvalidConfig` when a logger is already installed.
pub fn install<S: RecordSink + Send + Sync + 'static>(
    handler: CappedLogHandler<S>,
) -> Result<(), crate::errors::DbError> {
    let level = handler.level();
    log::set_boxed_logger(Box::new(handler))
        .map_err(|e| crate::errors::DbError::InvalidConfig(e.to_string()))?;
    log::set_max_level(level);
    Ok(())
}
