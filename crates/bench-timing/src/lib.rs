//! Inter-arrival timing replay for load generation.
//!
//! This crate loads an empirical inter-arrival distribution (or generates a
//! synthetic one) and hands out pacing delays for benchmark workers:
//! 1. `TimingData` holds the delay sequence plus its provenance and summary stats
//! 2. `generate_synthetic` builds a log-normal distribution for testing
//! 3. `TimingReplay` is a cursor over the data that yields scaled delays
//!
//! # Example
//!
//! ```ignore
//! use bench_timing::{ReplayMode, TimingData, TimingReplay};
//! use std::sync::Arc;
//!
//! let data = Arc::new(TimingData::load("timing.json")?);
//! let mut replay = TimingReplay::new(data, ReplayMode::Sequential, 10.0);
//! let delay = replay.next_delay();
//! ```

pub mod data;
pub mod error;
pub mod replay;
pub mod synthetic;

pub use data::{timing_percentile, TimingData, TimingStats, MIN_DELAY_MS};
pub use error::TimingError;
pub use replay::{ReplayMode, TimingReplay};
pub use synthetic::{generate_synthetic, generate_synthetic_seeded};
