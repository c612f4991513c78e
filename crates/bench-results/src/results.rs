//! Reduction of collected samples.

use crate::error::SinkError;
use crate::records::{BenchmarkRun, RunDescriptor, RunId, SampleRecord};
use crate::report::LatencySummary;
use crate::sink::ResultSink;
use bench_resources::ResourceStats;
use bench_runner::{Sample, SampleReceiver};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};

/// Index of the `p`th percentile in a sorted slice of `n` values.
///
/// Nearest rank at `floor((n - 1) * p / 100)`, with `p` clamped to
/// `[0, 100]`. `n` must be non-zero.
pub(crate) fn nearest_rank(n: usize, p: f64) -> usize {
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let index = ((n - 1) as f64 * p / 100.0).floor() as usize;
    index.min(n - 1)
}

/// All samples of one run plus its wall-clock bounds.
#[derive(Debug, Default)]
pub struct Results {
    samples: Vec<Sample>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    resource_stats: Option<ResourceStats>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    /// Drain `receiver` until the runner closes it. Returns the number of
    /// samples received.
    pub async fn collect(&mut self, mut receiver: SampleReceiver) -> usize {
        let before = self.samples.len();
        while let Some(sample) = receiver.recv().await {
            self.samples.push(sample);
        }
        let received = self.samples.len() - before;
        debug!("Collected {} samples", received);
        received
    }

    pub fn set_start_time(&mut self, start: DateTime<Utc>) {
        self.start_time = Some(start);
    }

    pub fn set_end_time(&mut self, end: DateTime<Utc>) {
        self.end_time = Some(end);
    }

    pub fn mark_start(&mut self) {
        self.set_start_time(Utc::now());
    }

    pub fn mark_end(&mut self) {
        self.set_end_time(Utc::now());
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Wall-clock run time. Zero when either bound is missing or end
    /// precedes start.
    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn total_requests(&self) -> usize {
        self.samples.len()
    }

    pub fn successful_requests(&self) -> usize {
        self.samples.iter().filter(|s| s.is_success()).count()
    }

    pub fn failed_requests(&self) -> usize {
        self.total_requests() - self.successful_requests()
    }

    /// Failed share of all samples, in percent.
    pub fn error_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        self.failed_requests() as f64 / total as f64 * 100.0
    }

    /// Samples per second over the run duration.
    pub fn throughput(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.total_requests() as f64 / secs
        } else {
            0.0
        }
    }

    /// Successful samples with a positive latency, sorted ascending.
    fn successful_latencies(&self) -> Vec<Duration> {
        let mut latencies: Vec<Duration> = self
            .samples
            .iter()
            .filter(|s| s.is_success() && !s.latency().is_zero())
            .map(Sample::latency)
            .collect();
        latencies.sort_unstable();
        latencies
    }

    /// Latency at percentile `p` over successful samples.
    pub fn percentile(&self, p: f64) -> Duration {
        let latencies = self.successful_latencies();
        if latencies.is_empty() {
            return Duration::ZERO;
        }
        latencies[nearest_rank(latencies.len(), p)]
    }

    pub fn avg_latency(&self) -> Duration {
        let latencies = self.successful_latencies();
        if latencies.is_empty() {
            return Duration::ZERO;
        }
        let total: u128 = latencies.iter().map(Duration::as_nanos).sum();
        Duration::from_nanos((total / latencies.len() as u128) as u64)
    }

    pub fn min_latency(&self) -> Duration {
        self.successful_latencies()
            .first()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn max_latency(&self) -> Duration {
        self.successful_latencies()
            .last()
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    pub fn set_resource_stats(&mut self, stats: ResourceStats) {
        self.resource_stats = Some(stats);
    }

    pub fn resource_stats(&self) -> Option<&ResourceStats> {
        self.resource_stats.as_ref()
    }

    /// Serializable report of this run.
    pub fn summary(&self, run: &RunDescriptor) -> LatencySummary {
        let latencies = self.successful_latencies();
        let at = |p: f64| {
            if latencies.is_empty() {
                Duration::ZERO
            } else {
                latencies[nearest_rank(latencies.len(), p)]
            }
        };

        LatencySummary {
            scenario: run.scenario.clone(),
            protocol: run.protocol.clone(),
            client: run.client.clone(),
            concurrency: run.concurrency,
            duration_secs: self.duration().as_secs_f64(),
            total_requests: self.total_requests() as u64,
            successful_requests: self.successful_requests() as u64,
            failed_requests: self.failed_requests() as u64,
            error_rate: self.error_rate(),
            throughput: self.throughput(),
            p50_ms: to_ms(at(50.0)),
            p90_ms: to_ms(at(90.0)),
            p99_ms: to_ms(at(99.0)),
            avg_ms: to_ms(self.avg_latency()),
            min_ms: to_ms(latencies.first().copied().unwrap_or_default()),
            max_ms: to_ms(latencies.last().copied().unwrap_or_default()),
            resources: self.resource_stats.clone(),
        }
    }

    /// Run record for persistence.
    pub fn build_run_record(&self, run: &RunDescriptor) -> BenchmarkRun {
        let resources = self.resource_stats.as_ref();
        BenchmarkRun {
            scenario: run.scenario.clone(),
            protocol: run.protocol.clone(),
            client: run.client.clone(),
            concurrency: run.concurrency,
            duration_secs: self.duration().as_secs(),
            rate_limit: run.rate_limit,
            cpu_usage_avg: resources.map(|r| r.cpu_avg_percent),
            memory_mb_avg: resources.map(|r| r.memory_avg_mb),
            memory_mb_peak: resources.map(|r| r.memory_peak_mb),
        }
    }

    pub fn sample_records(&self) -> Vec<SampleRecord> {
        self.samples.iter().map(SampleRecord::from_sample).collect()
    }

    /// Store the run and all of its samples in `sink`.
    pub async fn persist(
        &self,
        sink: &dyn ResultSink,
        run: &RunDescriptor,
    ) -> Result<RunId, SinkError> {
        let run_id = sink.record_run(&self.build_run_record(run)).await?;
        sink.record_samples(run_id, &self.sample_records()).await?;
        info!(
            "Persisted run {} with {} samples",
            run_id,
            self.total_requests()
        );
        Ok(run_id)
    }
}

/// Milliseconds at microsecond precision.
fn to_ms(latency: Duration) -> f64 {
    latency.as_micros() as f64 / 1000.0
}
