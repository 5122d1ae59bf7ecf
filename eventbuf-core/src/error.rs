//! Error types for eventbuf-core

use thiserror::Error;

/// Main error type for the eventbuf-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the collector
    #[error("transport error: {0}")]
    Transport(String),

    /// Key-value store failure
    #[error("store error: {0}")]
    Store(String),

    /// A batch no longer matches the head of the queue it was taken from
    #[error("stale batch: expected queue head {expected}, found {found}")]
    StaleBatch { expected: u64, found: u64 },
}

/// Result type alias for eventbuf-core
pub type Result<T> = std::result::Result<T, Error>;
