use super::entry::{Location, LogEntry, Runtime};
use bson::{Bson, Document as BsonDocument};
use chrono::Utc;
use log::kv::{self, Key, Value, VisitSource};
use std::sync::atomic::{AtomicI64, Ordering};

static NEXT_THREAD: AtomicI64 = AtomicI64::new(1);

thread_local! {
    static THREAD_ID: i64 = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
}

/// Small per-process number of the calling thread, assigned on first use.
fn thread_identifier() -> i64 {
    THREAD_ID.with(|id| *id)
}

/// Turns `log` records into `LogEntry` values.
///
/// The record's target becomes the service name. `data` holds the formatter's `extra`
/// fields overlaid with the record's own key-values (`log::info!(order = 7; "...")`).
#[derive(Debug, Clone, Default)]
pub struct LogFormatter {
    process_name: Option<String>,
    extra: BsonDocument,
}

impl LogFormatter {
    #[must_use]
    pub fn new() -> Self {
        let process_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()));
        Self { process_name, extra: BsonDocument::new() }
    }

    #[must_use]
    pub fn with_extra(mut self, extra: BsonDocument) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn format(&self, record: &log::Record<'_>) -> LogEntry {
        let thread = std::thread::current();
        let mut data = self.extra.clone();
        // the collector never fails
        let _ = record.key_values().visit(&mut DataCollector(&mut data));
        LogEntry {
            id: None,
            service: record.target().to_string(),
            level: record.level(),
            message: record.args().to_string(),
            time: Utc::now(),
            process: Runtime {
                identifier: Some(i64::from(std::process::id())),
                name: self.process_name.clone(),
            },
            thread: Runtime {
                identifier: Some(thread_identifier()),
                name: thread.name().map(str::to_string),
            },
            location: Location {
                path: record.file().map(str::to_string),
                line: record.line(),
                module: record.module_path().map(str::to_string),
            },
            data,
        }
    }
}

struct DataCollector<'a>(&'a mut BsonDocument);

impl<'kvs> VisitSource<'kvs> for DataCollector<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), kv::Error> {
        self.0.insert(key.as_str(), kv_to_bson(&value));
        Ok(())
    }
}

fn kv_to_bson(value: &Value<'_>) -> Bson {
    if let Some(b) = value.to_bool() {
        Bson::Boolean(b)
    } else if let Some(i) = value.to_i64() {
        Bson::Int64(i)
    } else if let Some(f) = value.to_f64() {
        Bson::Double(f)
    } else if let Some(s) = value.to_borrowed_str() {
        Bson::String(s.to_string())
    } else {
        Bson::String(value.to_string())
    }
}
