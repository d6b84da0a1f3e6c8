use super::runner::OutputMode;
use bson::{Bson, Document as BsonDocument};

pub fn parse_output_mode(s: Option<&str>) -> OutputMode {
    match s.map(str::to_ascii_lowercase).as_deref() {
        Some("json" | "ndjson" | "jsonl") => OutputMode::Json,
        Some("plain") => OutputMode::Plain,
        _ => OutputMode::Human,
    }
}

/// Relaxed extended JSON, one line.
pub fn json_line(doc: &BsonDocument) -> String {
    Bson::Document(doc.clone()).into_relaxed_extjson().to_string()
}
