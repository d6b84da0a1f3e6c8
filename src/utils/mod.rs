//! Utility modules: developer traces, process logging, slugs.
pub mod devlog;
pub mod logger;
pub mod slug;
