use bson::Bson;
use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub type CollectionName = String;

/// Field every stored record is keyed by.
pub const ID_FIELD: &str = "_id";

/// Store-generated identifier. Ordering follows insertion order within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub ObjectId);

impl DocumentId {
    #[must_use]
    pub fn from_parts(secs: u32, counter: u64) -> Self {
        let s = secs.to_be_bytes();
        let c = counter.to_be_bytes();
        Self(ObjectId::from_bytes([
            s[0], s[1], s[2], s[3], c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7],
        ]))
    }
}

impl From<DocumentId> for Bson {
    fn from(id: DocumentId) -> Self {
        Self::ObjectId(id.0)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

/// Hands out strictly increasing `DocumentId`s.
///
/// Layout is 4 bytes of big-endian seconds followed by an 8-byte big-endian counter.
/// The seconds component never moves backwards, so byte order equals issue order
/// even if the wall clock is stepped back.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_secs: u32,
    counter: u64,
}

impl IdGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { last_secs: 0, counter: 0 }
    }

    pub fn next_id(&mut self) -> DocumentId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or(0);
        self.last_secs = self.last_secs.max(now);
        self.counter = self.counter.wrapping_add(1);
        DocumentId::from_parts(self.last_secs, self.counter)
    }
}

/// Identifier of the most recently delivered record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeToken(pub Bson);

impl ResumeToken {
    #[must_use]
    pub const fn as_bson(&self) -> &Bson {
        &self.0
    }
}

impl std::fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Bson::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            other => write!(f, "{other}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_strictly_increasing() {
        let mut g = IdGenerator::new();
        let mut prev = g.next_id();
        for _ in 0..1000 {
            let next = g.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn seconds_never_go_backwards() {
        let mut g = IdGenerator { last_secs: u32::MAX - 1, counter: 0 };
        let a = g.next_id();
        let b = g.next_id();
        assert!(b > a);
        assert_eq!(&a.0.bytes()[..4], &(u32::MAX - 1).to_be_bytes());
    }
}
