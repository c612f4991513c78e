//! Error types for the PostgreSQL sink.

use bench_results::SinkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostgresSinkError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {0}")]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// COPY stored a different number of rows than it was given.
    #[error("Expected to copy {expected} rows, copied {copied}")]
    RowCountMismatch { expected: u64, copied: u64 },
}

impl From<PostgresSinkError> for SinkError {
    fn from(err: PostgresSinkError) -> Self {
        match err {
            PostgresSinkError::RowCountMismatch { expected, copied } => {
                SinkError::RowCountMismatch { expected, copied }
            }
            other => SinkError::Database(other.to_string()),
        }
    }
}
