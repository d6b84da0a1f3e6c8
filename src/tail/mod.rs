//! Resumable, timeout-bounded tailing of capped collections.
//!
//! ```no_run
//! use cappedlite::document::DocumentDecoder;
//! use cappedlite::query::{CursorOptions, Filter, QueryDescriptor};
//! use cappedlite::store::{CappedOptions, MemoryStore};
//! use cappedlite::tail::{TailOptions, tail};
//!
//! let store = MemoryStore::new();
//! store.create_capped("events", CappedOptions::by_count(1000)).unwrap();
//! let q = QueryDescriptor::new(Filter::True, CursorOptions::tailing());
//! let options = TailOptions::with_timeout_secs(5.0);
//! for doc in tail(&store, "events", q, DocumentDecoder, &options).unwrap() {
//!     println!("{:?}", doc.unwrap());
//! }
//! ```

mod budget;
mod reader;

pub use budget::TimeoutBudget;
pub use reader::{Tail, TailState};

use crate::document::RecordDecoder;
use crate::errors::DbError;
use crate::query::QueryDescriptor;
use crate::store::CappedStore;
use std::time::Duration;

const MIN_TIMEOUT: Duration = Duration::from_nanos(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailOptions {
    /// Best-effort ceiling on the whole tail. `None` or zero blocks forever.
    pub timeout: Option<Duration>,
}

impl TailOptions {
    #[must_use]
    pub const fn forever() -> Self {
        Self { timeout: None }
    }

    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout: Some(timeout) }
    }

    /// Seconds as a float; zero, negative or NaN values block forever.
    ///
    /// Any positive value bounds the tail: values below one nanosecond round up to it and
    /// values past `Duration::MAX` (infinity included) saturate.
    #[must_use]
    pub fn with_timeout_secs(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::forever();
        }
        let timeout = match Duration::try_from_secs_f64(secs) {
            Ok(d) => d.max(MIN_TIMEOUT),
            Err(_) => Duration::MAX,
        };
        Self::with_timeout(timeout)
    }
}

/// Tail `collection`, yielding decoded records until the timeout elapses or the caller stops.
///
/// # Errors
/// `NotCapped` if the collection is not capped, before anything is read.
pub fn tail<S: CappedStore, D: RecordDecoder>(
    store: S,
    collection: &str,
    query: QueryDescriptor,
    decoder: D,
    options: &TailOptions,
) -> Result<Tail<S, D>, DbError> {
    Tail::new(store, collection, query, decoder, options)
}
