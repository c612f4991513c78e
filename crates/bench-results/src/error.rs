//! Error types for result sinks.

use crate::records::RunId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Samples were recorded against a run the sink has never seen.
    #[error("Unknown run: {0}")]
    UnknownRun(RunId),

    /// A blocking file task panicked or was cancelled.
    #[error("Blocking task failed: {0}")]
    Blocking(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A bulk write stored a different number of rows than it was given.
    #[error("Expected to copy {expected} rows, copied {copied}")]
    RowCountMismatch { expected: u64, copied: u64 },
}
