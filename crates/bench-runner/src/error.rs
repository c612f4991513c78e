//! Error types for the load generator.

use thiserror::Error;

/// Failure of a single unit of work, as reported by a transport adapter.
///
/// These never abort a run. They are stored inside the failed `Sample`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Network or connection failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(u16),

    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// A subscription terminated abnormally.
    #[error("stream error: {0}")]
    Stream(String),

    /// The client was already closed.
    #[error("client closed")]
    Closed,
}

impl ClientError {
    /// Short, stable category used when persisting failed samples.
    pub fn category(&self) -> String {
        match self {
            ClientError::Transport(_) => "transport".to_string(),
            ClientError::Status(code) => format!("status_{code}"),
            ClientError::Decode(_) => "decode".to_string(),
            ClientError::Stream(_) => "stream".to_string(),
            ClientError::Closed => "closed".to_string(),
        }
    }
}

/// Setup-time and coordination errors from the runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Invalid runner configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query scenario needs at least one target.
    #[error("No targets available for the query scenario")]
    NoTargets,

    /// `results()` was called more than once.
    #[error("Results channel was already taken")]
    ResultsAlreadyTaken,

    /// One or more workers panicked.
    #[error("{0} worker(s) panicked")]
    WorkerPanicked(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(ClientError::Transport("refused".into()).category(), "transport");
        assert_eq!(ClientError::Status(503).category(), "status_503");
        assert_eq!(ClientError::Decode("eof".into()).category(), "decode");
        assert_eq!(ClientError::Stream("reset".into()).category(), "stream");
        assert_eq!(ClientError::Closed.category(), "closed");
    }

    #[test]
    fn test_display() {
        assert_eq!(ClientError::Status(404).to_string(), "unexpected status: 404");
        assert_eq!(
            RunnerError::WorkerPanicked(2).to_string(),
            "2 worker(s) panicked"
        );
    }
}
