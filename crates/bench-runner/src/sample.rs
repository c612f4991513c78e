//! Benchmark samples.

use crate::error::ClientError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One immutable measurement of a single unit of work.
///
/// Outcome and latency are fixed at construction; there are no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    latency: Duration,
    success: bool,
    error: Option<ClientError>,
    timestamp: DateTime<Utc>,
}

impl Sample {
    /// A successful measurement.
    pub fn success(latency: Duration, timestamp: DateTime<Utc>) -> Self {
        Self {
            latency,
            success: true,
            error: None,
            timestamp,
        }
    }

    /// A failed measurement with its cause.
    pub fn failure(latency: Duration, error: ClientError, timestamp: DateTime<Utc>) -> Self {
        Self {
            latency,
            success: false,
            error: Some(error),
            timestamp,
        }
    }

    /// A measurement built from the outcome of a request.
    pub fn from_outcome(
        latency: Duration,
        outcome: Result<(), ClientError>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        match outcome {
            Ok(()) => Self::success(latency, timestamp),
            Err(e) => Self::failure(latency, e, timestamp),
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    /// Wall-clock capture time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Persisted error category, if the sample failed.
    pub fn error_category(&self) -> Option<String> {
        self.error.as_ref().map(ClientError::category)
    }
}
