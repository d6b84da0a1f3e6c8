//! Resumable, timeout-bounded tailing of capped document collections.
//!
//! [`tail::Tail`] is the reader; [`store::MemoryStore`] the in-process capped store it
//! is usually paired with; [`logsink`] writes application logs into a capped collection
//! that can be followed with the same reader.

pub mod cli;
pub mod config;
pub mod document;
pub mod errors;
pub mod logsink;
pub mod query;
pub mod store;
pub mod tail;
pub mod types;
pub mod utils;

use crate::config::AppConfig;
use crate::document::{DocumentDecoder, RecordDecoder};
use crate::errors::DbError;
use crate::logsink::{CappedLogHandler, LogDecoder};
use crate::query::{CursorOptions, Filter, QueryDescriptor};
use crate::store::{CappedOptions, CollectionOptions, MemoryStore, RecordSink};
use crate::tail::Tail;
use bson::{Bson, Document as BsonDocument};

pub use crate::document::Document;
pub use crate::tail::{TailOptions, TailState};

/// A `MemoryStore` together with the configuration used to tail it.
#[derive(Debug, Clone, Default)]
pub struct Database {
    store: MemoryStore,
    config: AppConfig,
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: AppConfig) -> Self {
        Self { store: MemoryStore::new(), config }
    }

    #[must_use]
    pub const fn store(&self) -> &MemoryStore {
        &self.store
    }

    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    /// # Errors
    /// See [`MemoryStore::create_collection`].
    pub fn create_collection(&self, name: &str) -> Result<(), DbError> {
        self.store.create_collection(name, CollectionOptions::default())
    }

    /// # Errors
    /// See [`MemoryStore::create_collection`].
    pub fn create_capped(&self, name: &str, capped: CappedOptions) -> Result<(), DbError> {
        self.store.create_capped(name, capped)
    }

    /// # Errors
    /// `NoSuchCollection` or `DocumentTooLarge`.
    pub fn insert(&self, collection: &str, record: BsonDocument) -> Result<Bson, DbError> {
        self.store.insert(collection, record)
    }

    /// A tailing descriptor using the configured wait window.
    #[must_use]
    pub fn tail_query(&self, filter: Filter) -> QueryDescriptor {
        QueryDescriptor::new(
            filter,
            CursorOptions {
                max_await: Some(self.config.await_window()),
                ..CursorOptions::tailing()
            },
        )
    }

    /// Tail `collection` with the configured timeout, yielding [`Document`]s.
    ///
    /// # Errors
    /// `NotCapped` or `NoSuchCollection`.
    pub fn tail(
        &self,
        collection: &str,
        filter: Filter,
    ) -> Result<Tail<MemoryStore, DocumentDecoder>, DbError> {
        self.tail_as(collection, self.tail_query(filter), DocumentDecoder)
    }

    /// # Errors
    /// `NotCapped` or `NoSuchCollection`.
    pub fn tail_as<D: RecordDecoder>(
        &self,
        collection: &str,
        query: QueryDescriptor,
        decoder: D,
    ) -> Result<Tail<MemoryStore, D>, DbError> {
        Tail::new(self.store.clone(), collection, query, decoder, &self.config.tail_options())
    }

    /// Create the configured log collection unless it already exists.
    ///
    /// # Errors
    /// `InvalidConfig` for bad limits, `NotCapped` if a plain collection holds the name.
    pub fn ensure_log_collection(&self) -> Result<(), DbError> {
        let name = self.config.log_collection_name();
        match self.store.create_capped(name, self.config.log_collection_options()) {
            Err(DbError::CollectionAlreadyExists(_)) if !self.store.options(name)?.is_capped() => {
                Err(DbError::NotCapped(name.to_string()))
            }
            Err(DbError::CollectionAlreadyExists(_)) | Ok(()) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// A log handler writing into the configured log collection.
    #[must_use]
    pub fn log_handler(&self) -> CappedLogHandler<MemoryStore> {
        CappedLogHandler::new(self.store.clone(), self.config.log_collection_name())
            .with_capacity(self.config.log_buffer_capacity())
            .with_level(utils::logger::parse_level(self.config.log_level.as_deref()))
    }

    /// # Errors
    /// As [`Database::tail_as`].
    pub fn tail_logs(&self, filter: Filter) -> Result<Tail<MemoryStore, LogDecoder>, DbError> {
        self.tail_as(self.config.log_collection_name(), self.tail_query(filter), LogDecoder)
    }
}

/// Set up process logging from `CAPPEDLITE_LOG_*` variables.
///
/// # Errors
/// Returns the logger's error when it cannot be configured or is already installed.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    utils::logger::configure_from_env()?;
    Ok(())
}
