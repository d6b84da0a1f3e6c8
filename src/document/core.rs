use crate::errors::DecodeError;
use crate::types::ID_FIELD;
use bson::{Bson, Document as BsonDocument};

/// A decoded record: its identifier plus the remaining fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Bson,
    pub data: BsonDocument,
}

impl Document {
    #[must_use]
    pub const fn new(id: Bson, data: BsonDocument) -> Self {
        Self { id, data }
    }

    /// Split a raw stored record into identifier and body.
    ///
    /// # Errors
    /// Returns a `DecodeError` when the record carries no `_id`.
    pub fn from_raw(raw: &BsonDocument) -> Result<Self, DecodeError> {
        let id = raw
            .get(ID_FIELD)
            .cloned()
            .ok_or_else(|| DecodeError::new("record has no _id", raw))?;
        let mut data = raw.clone();
        data.remove(ID_FIELD);
        Ok(Self { id, data })
    }

    /// Reassemble the stored form, `_id` first.
    #[must_use]
    pub fn to_raw(&self) -> BsonDocument {
        let mut out = BsonDocument::new();
        out.insert(ID_FIELD, self.id.clone());
        for (k, v) in &self.data {
            out.insert(k.clone(), v.clone());
        }
        out
    }
}
