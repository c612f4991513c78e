//! Error types for timing data.

use thiserror::Error;

/// Errors that can occur while loading or generating timing data.
#[derive(Error, Debug)]
pub enum TimingError {
    /// The timing file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The timing file is not valid JSON or does not match the format.
    #[error("Failed to parse timing data: {0}")]
    Parse(#[from] serde_json::Error),

    /// The delay sequence is empty.
    #[error("Timing data has no inter-arrival values")]
    Empty,

    /// A delay value is negative or not a finite number.
    #[error("Invalid inter-arrival value at index {index}: {value}")]
    InvalidDelay { index: usize, value: f64 },

    /// Synthetic generation parameters are out of range.
    #[error("Invalid synthetic parameters: {0}")]
    InvalidParameters(String),
}
