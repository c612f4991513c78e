//! Timing data model and file format.

use crate::error::TimingError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Lower bound applied to every replayed delay so workers never busy-spin.
pub const MIN_DELAY_MS: f64 = 1.0;

/// Summary statistics over an inter-arrival sequence, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
}

impl TimingStats {
    /// Compute stats from a slice sorted ascending.
    ///
    /// Returns all-zero stats for an empty slice.
    pub fn from_sorted(sorted: &[f64]) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }

        Self {
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            avg_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
            p50_ms: timing_percentile(sorted, 0.50),
            p90_ms: timing_percentile(sorted, 0.90),
            p99_ms: timing_percentile(sorted, 0.99),
        }
    }

    /// Compute stats from an unsorted slice.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self::from_sorted(&sorted)
    }
}

/// Nearest-rank percentile over a sorted slice with `p` in `[0, 1]`.
///
/// The index is `floor(p * N)` clamped to `N - 1`, so for 10 values p50 picks
/// the 6th element.
pub fn timing_percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p * sorted.len() as f64) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// An empirical or synthetic inter-arrival distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingData {
    /// Identifier of the source the delays were captured from.
    pub topic_id: String,
    /// Network or environment tag.
    pub network: String,
    /// Number of messages observed.
    pub message_count: u64,
    /// Observed time span in seconds.
    pub time_span_seconds: f64,
    /// Average observed rate.
    pub avg_rate_per_second: f64,
    /// Ordered inter-arrival delays in milliseconds.
    pub inter_arrival_ms: Vec<f64>,
    /// Summary statistics computed when the data was captured.
    pub stats: TimingStats,
}

impl TimingData {
    /// Build timing data from a delay sequence, deriving stats and provenance.
    pub fn from_delays(
        topic_id: impl Into<String>,
        network: impl Into<String>,
        inter_arrival_ms: Vec<f64>,
    ) -> Result<Self, TimingError> {
        validate_delays(&inter_arrival_ms)?;

        let stats = TimingStats::from_values(&inter_arrival_ms);
        let total_ms: f64 = inter_arrival_ms.iter().sum();
        let time_span_seconds = total_ms / 1000.0;
        let message_count = inter_arrival_ms.len() as u64;
        let avg_rate_per_second = if time_span_seconds > 0.0 {
            message_count as f64 / time_span_seconds
        } else {
            0.0
        };

        Ok(Self {
            topic_id: topic_id.into(),
            network: network.into(),
            message_count,
            time_span_seconds,
            avg_rate_per_second,
            inter_arrival_ms,
            stats,
        })
    }

    /// Parse timing data from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, TimingError> {
        let data: TimingData = serde_json::from_str(json)?;
        validate_delays(&data.inter_arrival_ms)?;
        Ok(data)
    }

    /// Load timing data from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TimingError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let data = Self::from_json(&content)?;
        debug!(
            "Loaded {} inter-arrival values from {:?}",
            data.inter_arrival_ms.len(),
            path
        );
        Ok(data)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, TimingError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write timing data to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TimingError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Number of delay values.
    pub fn len(&self) -> usize {
        self.inter_arrival_ms.len()
    }

    /// Whether the delay sequence is empty. Always false for loaded data.
    pub fn is_empty(&self) -> bool {
        self.inter_arrival_ms.is_empty()
    }
}

fn validate_delays(delays: &[f64]) -> Result<(), TimingError> {
    if delays.is_empty() {
        return Err(TimingError::Empty);
    }
    if let Some((index, &value)) = delays
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || **v < 0.0)
    {
        return Err(TimingError::InvalidDelay { index, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> TimingData {
        TimingData {
            topic_id: "0.0.123456".to_string(),
            network: "testnet".to_string(),
            message_count: 5,
            time_span_seconds: 10.0,
            avg_rate_per_second: 0.5,
            inter_arrival_ms: vec![100.0, 200.0, 150.0, 300.0, 250.0],
            stats: TimingStats {
                min_ms: 100.0,
                max_ms: 300.0,
                avg_ms: 200.0,
                p50_ms: 200.0,
                p90_ms: 300.0,
                p99_ms: 300.0,
            },
        }
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let sorted: Vec<f64> = (1..=10).map(|v| v as f64).collect();

        // floor(0.5 * 10) = 5 -> 6th value
        assert_eq!(timing_percentile(&sorted, 0.50), 6.0);
        assert_eq!(timing_percentile(&sorted, 0.90), 10.0);
        assert_eq!(timing_percentile(&sorted, 0.99), 10.0);
        assert_eq!(timing_percentile(&sorted, 0.0), 1.0);
        assert_eq!(timing_percentile(&sorted, 1.0), 10.0);
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(timing_percentile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_stats_from_values() {
        let stats = TimingStats::from_values(&[300.0, 100.0, 200.0, 400.0]);
        assert_eq!(stats.min_ms, 100.0);
        assert_eq!(stats.max_ms, 400.0);
        assert_eq!(stats.avg_ms, 250.0);
        assert_eq!(stats.p50_ms, 300.0);
    }

    #[test]
    fn test_json_round_trip() {
        let data = sample_data();
        let json = data.to_json().unwrap();
        let parsed = TimingData::from_json(&json).unwrap();
        assert_eq!(parsed, data);
    }

    #[test]
    fn test_from_json_field_names() {
        let json = r#"{
            "topic_id": "0.0.1",
            "network": "mainnet",
            "message_count": 2,
            "time_span_seconds": 0.3,
            "avg_rate_per_second": 6.6,
            "inter_arrival_ms": [100, 200],
            "stats": {"min_ms": 100, "max_ms": 200, "avg_ms": 150,
                      "p50_ms": 200, "p90_ms": 200, "p99_ms": 200}
        }"#;
        let data = TimingData::from_json(json).unwrap();
        assert_eq!(data.network, "mainnet");
        assert_eq!(data.inter_arrival_ms, vec![100.0, 200.0]);
    }

    #[test]
    fn test_empty_delays_rejected() {
        let mut data = sample_data();
        data.inter_arrival_ms.clear();
        let json = serde_json::to_string(&data).unwrap();

        assert!(matches!(
            TimingData::from_json(&json),
            Err(TimingError::Empty)
        ));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let result = TimingData::from_delays("t", "n", vec![10.0, -1.0]);
        assert!(matches!(
            result,
            Err(TimingError::InvalidDelay { index: 1, .. })
        ));
    }

    #[test]
    fn test_from_delays_provenance() {
        let data = TimingData::from_delays("capture", "local", vec![500.0, 500.0]).unwrap();
        assert_eq!(data.message_count, 2);
        assert_eq!(data.time_span_seconds, 1.0);
        assert_eq!(data.avg_rate_per_second, 2.0);
        assert_eq!(data.stats.avg_ms, 500.0);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            TimingData::from_json("{not json"),
            Err(TimingError::Parse(_))
        ));
    }
}
