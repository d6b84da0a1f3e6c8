use bson::Document as BsonDocument;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),

    #[error("Can only tail capped collections: {0}")]
    NotCapped(String),

    #[error("Document of {size} bytes exceeds capped size {max_size} in {collection}")]
    DocumentTooLarge { collection: String, size: usize, max_size: usize },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A stored record could not be turned into the caller's output type.
///
/// The raw record is kept so the caller can see exactly what was rejected.
#[derive(Debug, Clone, Error)]
#[error("Decode error: {message}")]
pub struct DecodeError {
    pub message: String,
    pub record: BsonDocument,
}

impl DecodeError {
    #[must_use]
    pub fn new(message: impl Into<String>, record: &BsonDocument) -> Self {
        Self { message: message.into(), record: record.clone() }
    }
}
