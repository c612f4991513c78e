//! Synthetic inter-arrival generation.
//!
//! Delays follow a log-normal distribution, which is a reasonable model for
//! network traffic. The log-space parameters are chosen so that the linear
//! mean and standard deviation match the requested values.

use crate::data::{TimingData, MIN_DELAY_MS};
use crate::error::TimingError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Generate `count` synthetic delays with an entropy-seeded RNG.
pub fn generate_synthetic(
    count: usize,
    mean_ms: f64,
    stddev_ms: f64,
) -> Result<TimingData, TimingError> {
    generate_with_rng(count, mean_ms, stddev_ms, &mut StdRng::from_entropy())
}

/// Generate `count` synthetic delays deterministically from `seed`.
pub fn generate_synthetic_seeded(
    count: usize,
    mean_ms: f64,
    stddev_ms: f64,
    seed: u64,
) -> Result<TimingData, TimingError> {
    generate_with_rng(count, mean_ms, stddev_ms, &mut StdRng::seed_from_u64(seed))
}

fn generate_with_rng(
    count: usize,
    mean_ms: f64,
    stddev_ms: f64,
    rng: &mut StdRng,
) -> Result<TimingData, TimingError> {
    if count == 0 {
        return Err(TimingError::InvalidParameters(
            "count must be at least 1".to_string(),
        ));
    }
    if !(mean_ms.is_finite() && mean_ms > 0.0) {
        return Err(TimingError::InvalidParameters(format!(
            "mean must be positive, got {mean_ms}"
        )));
    }
    if !(stddev_ms.is_finite() && stddev_ms >= 0.0) {
        return Err(TimingError::InvalidParameters(format!(
            "stddev must be non-negative, got {stddev_ms}"
        )));
    }

    let variance_ratio = (stddev_ms * stddev_ms) / (mean_ms * mean_ms);
    let log_mean = mean_ms.ln() - 0.5 * (1.0 + variance_ratio).ln();
    let log_std = (1.0 + variance_ratio).ln().sqrt();

    let inter_arrival_ms: Vec<f64> = (0..count)
        .map(|_| {
            let z = standard_normal(rng);
            (log_mean + log_std * z).exp().max(MIN_DELAY_MS)
        })
        .collect();

    TimingData::from_delays("synthetic", "generated", inter_arrival_ms)
}

/// Box-Muller transform from two uniforms to one standard normal.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // u1 in (0, 1] keeps ln() finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
