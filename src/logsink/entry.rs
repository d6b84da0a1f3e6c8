use crate::document::RecordDecoder;
use crate::errors::DecodeError;
use crate::types::ID_FIELD;
use bson::{Bson, Document as BsonDocument};
use chrono::{DateTime, Utc};

/// Process or thread that produced a log line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Runtime {
    pub identifier: Option<i64>,
    pub name: Option<String>,
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime({}, '{}')",
            self.identifier.map_or_else(|| "-".to_string(), |i| i.to_string()),
            self.name.as_deref().unwrap_or("")
        )
    }
}

/// Source position of a log call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: Option<String>,
    pub line: Option<u32>,
    pub module: Option<String>,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Location({} at {}:{})",
            self.module.as_deref().unwrap_or("?"),
            self.path.as_deref().unwrap_or("?"),
            self.line.unwrap_or(0)
        )
    }
}

/// One stored log line.
///
/// Field names are kept short on disk: `s`ervice, `l`evel, `m`essage, `w`hen,
/// `p`rocess, `t`hread, l`o`cation, `d`ata.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: Option<Bson>,
    pub service: String,
    pub level: log::Level,
    pub message: String,
    pub time: DateTime<Utc>,
    pub process: Runtime,
    pub thread: Runtime,
    pub location: Location,
    pub data: BsonDocument,
}

fn level_code(level: log::Level) -> i32 {
    level as i32
}

fn level_from_code(code: i32) -> Option<log::Level> {
    match code {
        1 => Some(log::Level::Error),
        2 => Some(log::Level::Warn),
        3 => Some(log::Level::Info),
        4 => Some(log::Level::Debug),
        5 => Some(log::Level::Trace),
        _ => None,
    }
}

fn opt_str(d: &BsonDocument, key: &str) -> Option<String> {
    d.get_str(key).ok().map(str::to_string)
}

fn runtime_doc(r: &Runtime) -> BsonDocument {
    let mut out = BsonDocument::new();
    if let Some(i) = r.identifier {
        out.insert("i", i);
    }
    if let Some(n) = &r.name {
        out.insert("n", n.clone());
    }
    out
}

fn runtime_from(d: Option<&BsonDocument>) -> Runtime {
    d.map_or_else(Runtime::default, |d| Runtime {
        identifier: d.get_i64("i").ok().or_else(|| d.get_i32("i").ok().map(i64::from)),
        name: opt_str(d, "n"),
    })
}

impl LogEntry {
    /// Stored form, without `_id` unless one is already known.
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let mut location = BsonDocument::new();
        if let Some(p) = &self.location.path {
            location.insert("p", p.clone());
        }
        if let Some(l) = self.location.line {
            location.insert("l", i64::from(l));
        }
        if let Some(m) = &self.location.module {
            location.insert("o", m.clone());
        }
        let mut out = BsonDocument::new();
        if let Some(id) = &self.id {
            out.insert(ID_FIELD, id.clone());
        }
        out.insert("s", self.service.clone());
        out.insert("l", level_code(self.level));
        out.insert("m", self.message.clone());
        out.insert("w", bson::DateTime::from_millis(self.time.timestamp_millis()));
        out.insert("p", runtime_doc(&self.process));
        out.insert("t", runtime_doc(&self.thread));
        out.insert("o", location);
        out.insert("d", self.data.clone());
        out
    }

    /// # Errors
    /// Returns a `DecodeError` when a required field is missing or has the wrong type.
    pub fn from_document(raw: &BsonDocument) -> Result<Self, DecodeError> {
        let service =
            raw.get_str("s").map_err(|_| DecodeError::new("log entry without service", raw))?;
        let level = raw
            .get_i32("l")
            .ok()
            .and_then(level_from_code)
            .ok_or_else(|| DecodeError::new("log entry with invalid level", raw))?;
        let time = raw
            .get_datetime("w")
            .ok()
            .and_then(|w| DateTime::<Utc>::from_timestamp_millis(w.timestamp_millis()))
            .ok_or_else(|| DecodeError::new("log entry without time", raw))?;
        let location = raw.get_document("o").ok();
        Ok(Self {
            id: raw.get(ID_FIELD).cloned(),
            service: service.to_string(),
            level,
            message: opt_str(raw, "m").unwrap_or_default(),
            time,
            process: runtime_from(raw.get_document("p").ok()),
            thread: runtime_from(raw.get_document("t").ok()),
            location: Location {
                path: location.and_then(|o| opt_str(o, "p")),
                line: location
                    .and_then(|o| o.get_i64("l").ok())
                    .and_then(|l| u32::try_from(l).ok()),
                module: location.and_then(|o| opt_str(o, "o")),
            },
            data: raw.get_document("d").cloned().unwrap_or_default(),
        })
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} - {}",
            self.time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.level,
            self.service,
            self.message
        )
    }
}

/// Decodes records of the log collection into `LogEntry`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDecoder;

impl RecordDecoder for LogDecoder {
    type Output = LogEntry;
    fn decode(&self, raw: &BsonDocument) -> Result<LogEntry, DecodeError> {
        LogEntry::from_document(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn sample() -> LogEntry {
        LogEntry {
            id: None,
            service: "api".into(),
            level: log::Level::Warn,
            message: "disk almost full".into(),
            time: DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap(),
            process: Runtime { identifier: Some(42), name: Some("api".into()) },
            thread: Runtime { identifier: Some(3), name: Some("main".into()) },
            location: Location {
                path: Some("src/disk.rs".into()),
                line: Some(10),
                module: Some("api::disk".into()),
            },
            data: doc! {"free_mb": 12},
        }
    }

    #[test]
    fn stored_form_uses_short_names() {
        let d = sample().to_document();
        assert_eq!(d.get_str("s").unwrap(), "api");
        assert_eq!(d.get_i32("l").unwrap(), 2);
        assert_eq!(d.get_document("o").unwrap().get_str("o").unwrap(), "api::disk");
        assert!(d.get(ID_FIELD).is_none());
    }

    #[test]
    fn decoder_rebuilds_entry() {
        let mut raw = sample().to_document();
        raw.insert(ID_FIELD, 7);
        let e = LogDecoder.decode(&raw).unwrap();
        assert_eq!(e.id, Some(Bson::Int32(7)));
        assert_eq!(LogEntry { id: None, ..e }, sample());
    }

    #[test]
    fn decoder_rejects_foreign_records() {
        let raw = doc! {"_id": 1, "hello": "world"};
        let err = LogDecoder.decode(&raw).unwrap_err();
        assert_eq!(err.record, raw);
    }
}
