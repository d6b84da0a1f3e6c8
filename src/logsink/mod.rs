//! Application log lines stored in a capped collection, and read back with a tail.

mod entry;
mod format;
mod handler;

pub use entry::{Location, LogDecoder, LogEntry, Runtime};
pub use format::LogFormatter;
pub use handler::{CappedLogHandler, DEFAULT_BUFFER_CAPACITY, install};

use crate::store::CappedOptions;

pub const LOG_COLLECTION: &str = "log";
pub const LOG_MAX_DOCUMENTS: usize = 65_535;
pub const LOG_MAX_SIZE: usize = 100 * 1024 * 1024;

/// Limits of the default log collection.
#[must_use]
pub const fn log_collection_options() -> CappedOptions {
    CappedOptions { max_documents: Some(LOG_MAX_DOCUMENTS), max_size: LOG_MAX_SIZE }
}
