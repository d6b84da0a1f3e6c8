//! Backing store contract and the in-memory capped store.
//!
//! The tail reader only depends on [`CappedStore`] and [`ReadHandle`]; anything able to
//! answer "is this collection capped" and hand out tailable handles can back it.

mod memory;
mod options;

pub use memory::{MemoryHandle, MemoryStore};
pub use options::{CappedOptions, CollectionOptions};

use crate::errors::DbError;
use crate::query::QueryDescriptor;
use bson::{Bson, Document as BsonDocument};
use std::sync::Arc;

/// A live, possibly blocking stream of records matching one query.
pub trait ReadHandle {
    /// Pull the next record.
    ///
    /// `Ok(None)` means no record arrived within the handle's wait window; check
    /// [`ReadHandle::is_alive`] to tell "try again" from "exhausted, reopen".
    ///
    /// # Errors
    /// Store failures are returned as-is.
    fn try_next(&mut self) -> Result<Option<BsonDocument>, DbError>;

    fn is_alive(&self) -> bool;

    /// Release the handle. Calling it more than once is a no-op.
    fn close(&mut self);
}

pub trait CappedStore {
    type Handle: ReadHandle;

    /// # Errors
    /// Returns `NoSuchCollection` (or a store error) when the collection cannot be inspected.
    fn is_capped(&self, collection: &str) -> Result<bool, DbError>;

    /// Open a handle honouring the descriptor's effective filter and cursor options.
    ///
    /// # Errors
    /// Store failures are returned as-is.
    fn open_tailable(&self, collection: &str, query: &QueryDescriptor)
    -> Result<Self::Handle, DbError>;
}

/// Write side used by the log sink.
pub trait RecordSink {
    /// Append a record, returning its `_id` (assigned by the store when absent).
    ///
    /// # Errors
    /// Returns the store's error when the record cannot be written.
    fn insert(&self, collection: &str, record: BsonDocument) -> Result<Bson, DbError>;

    /// # Errors
    /// Stops at the first failing record and returns its error.
    fn insert_many(
        &self,
        collection: &str,
        records: Vec<BsonDocument>,
    ) -> Result<Vec<Bson>, DbError> {
        records.into_iter().map(|r| self.insert(collection, r)).collect()
    }
}

impl<T: CappedStore + ?Sized> CappedStore for &T {
    type Handle = T::Handle;
    fn is_capped(&self, collection: &str) -> Result<bool, DbError> {
        (**self).is_capped(collection)
    }
    fn open_tailable(
        &self,
        collection: &str,
        query: &QueryDescriptor,
    ) -> Result<Self::Handle, DbError> {
        (**self).open_tailable(collection, query)
    }
}

impl<T: CappedStore + ?Sized> CappedStore for Arc<T> {
    type Handle = T::Handle;
    fn is_capped(&self, collection: &str) -> Result<bool, DbError> {
        (**self).is_capped(collection)
    }
    fn open_tailable(
        &self,
        collection: &str,
        query: &QueryDescriptor,
    ) -> Result<Self::Handle, DbError> {
        (**self).open_tailable(collection, query)
    }
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn insert(&self, collection: &str, record: BsonDocument) -> Result<Bson, DbError> {
        (**self).insert(collection, record)
    }
    fn insert_many(
        &self,
        collection: &str,
        records: Vec<BsonDocument>,
    ) -> Result<Vec<Bson>, DbError> {
        (**self).insert_many(collection, records)
    }
}

impl<H: ReadHandle + ?Sized> ReadHandle for Box<H> {
    fn try_next(&mut self) -> Result<Option<BsonDocument>, DbError> {
        (**self).try_next()
    }
    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
    fn close(&mut self) {
        (**self).close();
    }
}
