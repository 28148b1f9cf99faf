//! Error types shared by the synchronizer and the dashboard.
//!
//! The `MarketError` enum unifies the failure cases for I/O, serialization,
//! configuration, channel communication and cancellation, so every crate in the
//! workspace can propagate a single error type. Upstream quote failures are not
//! represented here: they travel as values on `Snapshot::error`.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by the workspace.
#[derive(Error, Debug)]
pub enum MarketError {
    /// I/O error originating from the standard library (files, threads).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be built or a request could not be issued.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The operation was abandoned because its cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,

    /// Error while parsing a tickers file.
    #[error("Parse tickers file error: {0}")]
    ParseTickersFile(String),

    /// Crossbeam/channel send failed (e.g., receiver dropped); contains a short context string.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),

    /// A worker thread panicked or could not be joined.
    #[error("Worker thread failed: {0}")]
    Thread(String),
}

impl<T> From<PoisonError<T>> for MarketError {
    fn from(err: PoisonError<T>) -> Self {
        MarketError::MutexLock(err.to_string())
    }
}
