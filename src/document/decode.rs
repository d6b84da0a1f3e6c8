//! Record decoders: turn a raw stored record into the caller's output type.
//!
//! Decoders must be side-effect free and must not block; the tail reader calls
//! them while holding its open read handle.

use super::core::Document;
use crate::errors::DecodeError;
use bson::Document as BsonDocument;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

pub trait RecordDecoder {
    type Output;

    /// # Errors
    /// Returns a `DecodeError` carrying `raw` when the record cannot be converted.
    fn decode(&self, raw: &BsonDocument) -> Result<Self::Output, DecodeError>;
}

impl<T, F> RecordDecoder for F
where
    F: Fn(&BsonDocument) -> Result<T, DecodeError>,
{
    type Output = T;
    fn decode(&self, raw: &BsonDocument) -> Result<T, DecodeError> {
        self(raw)
    }
}

/// Hands back the stored record untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl RecordDecoder for RawDecoder {
    type Output = BsonDocument;
    fn decode(&self, raw: &BsonDocument) -> Result<BsonDocument, DecodeError> {
        Ok(raw.clone())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentDecoder;

impl RecordDecoder for DocumentDecoder {
    type Output = Document;
    fn decode(&self, raw: &BsonDocument) -> Result<Document, DecodeError> {
        Document::from_raw(raw)
    }
}

/// Maps records onto any serde-deserializable type.
pub struct SerdeDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeDecoder<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for SerdeDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> RecordDecoder for SerdeDecoder<T> {
    type Output = T;
    fn decode(&self, raw: &BsonDocument) -> Result<T, DecodeError> {
        bson::deserialize_from_document(raw.clone())
            .map_err(|e| DecodeError::new(e.to_string(), raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        sensor: String,
        value: i32,
    }

    #[test]
    fn serde_decoder_maps_fields() {
        let raw = doc! {"_id": 1, "sensor": "t1", "value": 7};
        let r = SerdeDecoder::<Reading>::new().decode(&raw).unwrap();
        assert_eq!(r, Reading { sensor: "t1".into(), value: 7 });
    }

    #[test]
    fn serde_decoder_keeps_offending_record() {
        let raw = doc! {"_id": 1, "sensor": 5};
        let err = SerdeDecoder::<Reading>::new().decode(&raw).unwrap_err();
        assert_eq!(err.record, raw);
    }

    #[test]
    fn document_decoder_requires_id() {
        let err = DocumentDecoder.decode(&doc! {"a": 1}).unwrap_err();
        assert!(err.message.contains("_id"));
        let d = DocumentDecoder.decode(&doc! {"_id": 3, "a": 1}).unwrap();
        assert_eq!(d.id, bson::Bson::Int32(3));
        assert_eq!(d.data, doc! {"a": 1});
        assert_eq!(d.to_raw(), doc! {"_id": 3, "a": 1});
    }

    #[test]
    fn closures_are_decoders() {
        let dec = |raw: &BsonDocument| {
            raw.get_i32("n").map_err(|_| DecodeError::new("missing n", raw))
        };
        assert_eq!(dec.decode(&doc! {"n": 4}).unwrap(), 4);
        assert!(dec.decode(&doc! {}).is_err());
    }
}
