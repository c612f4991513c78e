//! Persisted record types shared by every sink.

use crate::results::nearest_rank;
use bench_runner::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client label recorded for runs produced by this tool.
pub const DEFAULT_CLIENT: &str = "rust";

/// Identifier a sink assigns to a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub i64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What was run, independent of its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDescriptor {
    pub scenario: String,
    pub protocol: String,
    pub client: String,
    pub concurrency: u32,
    pub rate_limit: Option<u32>,
}

impl RunDescriptor {
    pub fn new(scenario: impl Into<String>, protocol: impl Into<String>, concurrency: u32) -> Self {
        Self {
            scenario: scenario.into(),
            protocol: protocol.into(),
            client: DEFAULT_CLIENT.to_string(),
            concurrency,
            rate_limit: None,
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = client.into();
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<u32>) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// One benchmark run as stored by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub scenario: String,
    pub protocol: String,
    #[serde(default = "default_client")]
    pub client: String,
    pub concurrency: u32,
    pub duration_secs: u64,
    pub rate_limit: Option<u32>,
    pub cpu_usage_avg: Option<f64>,
    pub memory_mb_avg: Option<f64>,
    pub memory_mb_peak: Option<f64>,
}

fn default_client() -> String {
    DEFAULT_CLIENT.to_string()
}

/// One sample as stored by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    /// Latency in milliseconds at microsecond precision.
    pub latency_ms: f64,
    pub success: bool,
    pub error_type: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SampleRecord {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            latency_ms: sample.latency().as_micros() as f64 / 1000.0,
            success: sample.is_success(),
            error_type: sample.error_category(),
            timestamp: sample.timestamp(),
        }
    }
}

/// Aggregate read back from a sink for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkStats {
    pub run_id: RunId,
    pub scenario: String,
    pub protocol: String,
    pub client: String,
    pub concurrency: u32,
    pub duration_secs: u64,
    pub total_samples: i64,
    pub successful: i64,
    pub p50_latency_ms: f64,
    pub p90_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub cpu_usage_avg: Option<f64>,
    pub memory_mb_avg: Option<f64>,
    pub memory_mb_peak: Option<f64>,
}

impl BenchmarkStats {
    /// Reduce stored samples the same way [`Results`](crate::Results) does:
    /// latency figures cover successful samples with positive latency.
    pub fn from_records(run_id: RunId, run: &BenchmarkRun, samples: &[SampleRecord]) -> Self {
        let mut latencies: Vec<f64> = samples
            .iter()
            .filter(|s| s.success && s.latency_ms > 0.0)
            .map(|s| s.latency_ms)
            .collect();
        latencies.sort_by(|a, b| a.total_cmp(b));

        let at = |p: f64| {
            if latencies.is_empty() {
                0.0
            } else {
                latencies[nearest_rank(latencies.len(), p)]
            }
        };
        let avg = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };

        Self {
            run_id,
            scenario: run.scenario.clone(),
            protocol: run.protocol.clone(),
            client: run.client.clone(),
            concurrency: run.concurrency,
            duration_secs: run.duration_secs,
            total_samples: samples.len() as i64,
            successful: samples.iter().filter(|s| s.success).count() as i64,
            p50_latency_ms: at(50.0),
            p90_latency_ms: at(90.0),
            p99_latency_ms: at(99.0),
            avg_latency_ms: avg,
            min_latency_ms: latencies.first().copied().unwrap_or(0.0),
            max_latency_ms: latencies.last().copied().unwrap_or(0.0),
            cpu_usage_avg: run.cpu_usage_avg,
            memory_mb_avg: run.memory_mb_avg,
            memory_mb_peak: run.memory_mb_peak,
        }
    }
}

/// Optional criteria for dashboard-style stats queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub scenario: Option<String>,
    pub protocol: Option<String>,
    pub client: Option<String>,
    pub run_id: Option<RunId>,
    /// Maximum rows, newest first. `None` returns everything.
    pub limit: Option<i64>,
}
