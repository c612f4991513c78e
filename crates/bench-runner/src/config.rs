//! Runner configuration.

use crate::error::RunnerError;
use std::fmt;
use std::str::FromStr;

/// Capacity of the sample channel between workers and the collector.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// How a timing replay cursor is shared across workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplaySharing {
    /// Each worker owns an independent cursor forked from the replay.
    #[default]
    PerWorker,
    /// All workers draw from one cursor behind a mutex.
    Shared,
}

impl FromStr for ReplaySharing {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-worker" | "per_worker" => Ok(ReplaySharing::PerWorker),
            "shared" => Ok(ReplaySharing::Shared),
            other => Err(RunnerError::Config(format!(
                "unknown replay sharing '{other}' (expected per-worker or shared)"
            ))),
        }
    }
}

impl fmt::Display for ReplaySharing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplaySharing::PerWorker => write!(f, "per-worker"),
            ReplaySharing::Shared => write!(f, "shared"),
        }
    }
}

/// Configuration for a [`Runner`](crate::Runner).
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Number of independent workers.
    pub concurrency: usize,
    /// Target event rate for streams (events/sec, 0 = unlimited).
    pub rate: u32,
    /// Bounded capacity of the sample channel.
    pub channel_capacity: usize,
    /// Replay cursor sharing policy.
    pub replay_sharing: ReplaySharing,
}

impl RunnerConfig {
    /// Create a configuration with `concurrency` workers and defaults elsewhere.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            rate: 0,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            replay_sharing: ReplaySharing::default(),
        }
    }

    /// Set the stream rate hint.
    pub fn with_rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the sample channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the replay sharing policy.
    pub fn with_replay_sharing(mut self, sharing: ReplaySharing) -> Self {
        self.replay_sharing = sharing;
        self
    }

    /// Reject configurations that cannot start a run.
    pub fn validate(&self) -> Result<(), RunnerError> {
        if self.concurrency == 0 {
            return Err(RunnerError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(RunnerError::Config(
                "channel capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
