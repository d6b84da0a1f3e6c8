use serde::{Deserialize, Serialize};

/// Size limits of a capped collection. The oldest records are trimmed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedOptions {
    /// Maximum number of records; `None` bounds by size only.
    pub max_documents: Option<usize>,
    /// Maximum total BSON size in bytes.
    pub max_size: usize,
}

impl CappedOptions {
    #[must_use]
    pub const fn new(max_documents: Option<usize>, max_size: usize) -> Self {
        Self { max_documents, max_size }
    }

    #[must_use]
    pub const fn by_count(max_documents: usize) -> Self {
        Self { max_documents: Some(max_documents), max_size: usize::MAX }
    }

    pub(crate) fn over_limit(&self, len: usize, bytes: usize) -> bool {
        self.max_documents.is_some_and(|m| len > m) || bytes > self.max_size
    }
}

/// How a collection is created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    pub capped: Option<CappedOptions>,
}

impl CollectionOptions {
    #[must_use]
    pub const fn capped(opts: CappedOptions) -> Self {
        Self { capped: Some(opts) }
    }

    #[must_use]
    pub const fn is_capped(&self) -> bool {
        self.capped.is_some()
    }
}
