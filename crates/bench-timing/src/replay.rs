//! Replay cursor over timing data.

use crate::data::{TimingData, MIN_DELAY_MS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How delays are drawn from the distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    /// Replay the exact stored order, wrapping at the end.
    Sequential,
    /// Draw a uniformly random element on every call.
    #[default]
    Sample,
}

impl ReplayMode {
    /// Parse a mode name. Anything other than `sequential` means sampling.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => ReplayMode::Sequential,
            _ => ReplayMode::Sample,
        }
    }
}

impl fmt::Display for ReplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayMode::Sequential => write!(f, "sequential"),
            ReplayMode::Sample => write!(f, "sample"),
        }
    }
}

/// A stateful cursor producing pacing delays from shared timing data.
///
/// The delay sequence is infinite: sequential mode wraps modulo the
/// sequence length and sample mode draws with replacement.
#[derive(Debug, Clone)]
pub struct TimingReplay {
    data: Arc<TimingData>,
    mode: ReplayMode,
    speedup: f64,
    index: usize,
    rng: StdRng,
}

impl TimingReplay {
    /// Create a replay cursor with an entropy-seeded RNG.
    ///
    /// Non-positive or non-finite speedups are coerced to 1.0.
    pub fn new(data: Arc<TimingData>, mode: ReplayMode, speedup: f64) -> Self {
        Self::with_rng(data, mode, speedup, StdRng::from_entropy())
    }

    /// Create a replay cursor with a deterministic RNG.
    pub fn seeded(data: Arc<TimingData>, mode: ReplayMode, speedup: f64, seed: u64) -> Self {
        Self::with_rng(data, mode, speedup, StdRng::seed_from_u64(seed))
    }

    fn with_rng(data: Arc<TimingData>, mode: ReplayMode, speedup: f64, rng: StdRng) -> Self {
        let speedup = if speedup.is_finite() && speedup > 0.0 {
            speedup
        } else {
            1.0
        };
        Self {
            data,
            mode,
            speedup,
            index: 0,
            rng,
        }
    }

    /// Next delay to apply, scaled by `1 / speedup`.
    pub fn next_delay(&mut self) -> Duration {
        let delays = &self.data.inter_arrival_ms;
        if delays.is_empty() {
            return Duration::ZERO;
        }

        let delay_ms = match self.mode {
            ReplayMode::Sequential => {
                let value = delays[self.index];
                self.index = (self.index + 1) % delays.len();
                value
            }
            ReplayMode::Sample => delays[self.rng.gen_range(0..delays.len())],
        };

        let nanos = (delay_ms.max(MIN_DELAY_MS) * 1_000_000.0 / self.speedup).round();
        Duration::from_nanos(nanos as u64)
    }

    /// Independent cursor for worker `worker` out of `workers`.
    ///
    /// Sequential forks start at evenly spaced offsets so workers do not
    /// replay the same delay in lockstep. Every fork gets its own RNG derived
    /// from this cursor's RNG.
    pub fn fork(&mut self, worker: usize, workers: usize) -> Self {
        let len = self.data.inter_arrival_ms.len();
        let index = if workers == 0 || len == 0 {
            0
        } else {
            (worker % workers) * len / workers
        };
        let seed: u64 = self.rng.gen();
        Self {
            data: Arc::clone(&self.data),
            mode: self.mode,
            speedup: self.speedup,
            index,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Rewind the sequential cursor to the start.
    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Current sequential position.
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    pub fn speedup(&self) -> f64 {
        self.speedup
    }

    pub fn data(&self) -> &TimingData {
        &self.data
    }

    /// Human-readable description of the loaded distribution.
    pub fn summary(&self) -> String {
        let data = &self.data;
        format!(
            "Timing replay loaded:\n\
             \x20 Source: {} topic {}\n\
             \x20 Messages: {} over {:.1}s ({:.2} msg/s)\n\
             \x20 Inter-arrival: p50={:.1}ms, p99={:.1}ms\n\
             \x20 Mode: {}, speedup: {:.1}x\n\
             \x20 Effective rate: ~{:.2} req/s per worker",
            data.network,
            data.topic_id,
            data.message_count,
            data.time_span_seconds,
            data.avg_rate_per_second,
            data.stats.p50_ms,
            data.stats.p99_ms,
            self.mode,
            self.speedup,
            data.avg_rate_per_second * self.speedup,
        )
    }
}
