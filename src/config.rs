//! Process configuration read from TOML files and `CAPPEDLITE_*` environment variables.

use crate::errors::DbError;
use crate::logsink::{DEFAULT_BUFFER_CAPACITY, LOG_COLLECTION, LOG_MAX_DOCUMENTS, LOG_MAX_SIZE};
use crate::store::CappedOptions;
use crate::tail::TailOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "CAPPEDLITE_CONFIG";
pub const CONFIG_FILE: &str = "cappedlite.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_retention: Option<usize>,
    /// Seconds; zero means tail forever.
    pub tail_timeout_secs: Option<f64>,
    /// Wait window of a tailable handle, milliseconds.
    pub await_ms: Option<u64>,
    pub log_collection: Option<String>,
    pub log_max_documents: Option<usize>,
    pub log_max_size: Option<usize>,
    pub log_buffer_capacity: Option<usize>,
}

impl AppConfig {
    /// Parse one TOML document.
    ///
    /// # Errors
    /// `Toml` when the text is not a valid configuration.
    pub fn from_toml(text: &str) -> Result<Self, DbError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    /// `Io` when the file cannot be read, `Toml` when it does not parse.
    pub fn from_file(path: &Path) -> Result<Self, DbError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Files in precedence order: explicit path, `$CAPPEDLITE_CONFIG`, `./cappedlite.toml`.
    #[must_use]
    pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(p) = explicit {
            paths.push(p.to_path_buf());
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(p));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join(CONFIG_FILE));
        }
        paths
    }

    /// Fill fields still unset from `other`.
    pub fn merge_missing(&mut self, other: Self) {
        fn fill<T>(slot: &mut Option<T>, v: Option<T>) {
            if slot.is_none() {
                *slot = v;
            }
        }
        fill(&mut self.log_dir, other.log_dir);
        fill(&mut self.log_level, other.log_level);
        fill(&mut self.log_retention, other.log_retention);
        fill(&mut self.tail_timeout_secs, other.tail_timeout_secs);
        fill(&mut self.await_ms, other.await_ms);
        fill(&mut self.log_collection, other.log_collection);
        fill(&mut self.log_max_documents, other.log_max_documents);
        fill(&mut self.log_max_size, other.log_max_size);
        fill(&mut self.log_buffer_capacity, other.log_buffer_capacity);
    }

    /// Fill unset fields from environment-style lookups (`CAPPEDLITE_LOG_DIR`, ...).
    ///
    /// Unparsable numbers are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let num = |key: &str| lookup(key).and_then(|s| s.trim().parse::<usize>().ok());
        self.merge_missing(Self {
            log_dir: lookup("CAPPEDLITE_LOG_DIR").map(PathBuf::from),
            log_level: lookup("CAPPEDLITE_LOG_LEVEL"),
            log_retention: num("CAPPEDLITE_LOG_RETENTION"),
            tail_timeout_secs: lookup("CAPPEDLITE_TAIL_TIMEOUT")
                .and_then(|s| s.trim().parse().ok()),
            await_ms: lookup("CAPPEDLITE_AWAIT_MS").and_then(|s| s.trim().parse().ok()),
            log_collection: lookup("CAPPEDLITE_LOG_COLLECTION"),
            log_max_documents: num("CAPPEDLITE_LOG_MAX_DOCUMENTS"),
            log_max_size: num("CAPPEDLITE_LOG_MAX_SIZE"),
            log_buffer_capacity: num("CAPPEDLITE_LOG_BUFFER"),
        });
    }

    /// Load with precedence: files (first found per field) then environment, then validate.
    ///
    /// A file that exists but does not parse is an error; missing files are skipped.
    ///
    /// # Errors
    /// `Io`/`Toml` for unreadable files, `InvalidConfig` from [`AppConfig::validate`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, DbError> {
        let mut cfg = Self::default();
        for p in Self::candidate_paths(explicit) {
            if p.exists() {
                log::debug!("reading config {}", p.display());
                cfg.merge_missing(Self::from_file(&p)?);
            }
        }
        cfg.apply_env_from(|k| std::env::var(k).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// `InvalidConfig` for a negative or non-finite timeout, zero limits or an empty
    /// collection name.
    pub fn validate(&self) -> Result<(), DbError> {
        if let Some(t) = self.tail_timeout_secs
            && (!t.is_finite() || t < 0.0)
        {
            return Err(DbError::InvalidConfig(format!("tail_timeout_secs must be >= 0, got {t}")));
        }
        if self.await_ms == Some(0) {
            return Err(DbError::InvalidConfig("await_ms must be > 0".into()));
        }
        if self.log_max_documents == Some(0) || self.log_max_size == Some(0) {
            return Err(DbError::InvalidConfig("log collection limits must be > 0".into()));
        }
        if self.log_collection.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(DbError::InvalidConfig("log_collection must not be empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn tail_options(&self) -> TailOptions {
        self.tail_timeout_secs.map_or_else(TailOptions::forever, TailOptions::with_timeout_secs)
    }

    #[must_use]
    pub fn await_window(&self) -> Duration {
        self.await_ms.map_or(crate::query::DEFAULT_MAX_AWAIT, Duration::from_millis)
    }

    #[must_use]
    pub fn log_collection_name(&self) -> &str {
        self.log_collection.as_deref().unwrap_or(LOG_COLLECTION)
    }

    #[must_use]
    pub fn log_collection_options(&self) -> CappedOptions {
        CappedOptions::new(
            Some(self.log_max_documents.unwrap_or(LOG_MAX_DOCUMENTS)),
            self.log_max_size.unwrap_or(LOG_MAX_SIZE),
        )
    }

    #[must_use]
    pub fn log_buffer_capacity(&self) -> usize {
        self.log_buffer_capacity.unwrap_or(DEFAULT_BUFFER_CAPACITY)
    }
}
