//! Periodic resource sampler.

use crate::error::ResourceError;
use crate::probe::{ProcessProbe, SysinfoProbe};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Sampling interval used by the CLI unless overridden.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reduced resource usage for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub cpu_avg_percent: f64,
    pub memory_avg_mb: f64,
    pub memory_peak_mb: f64,
    /// Number of ticks that produced a memory observation.
    pub sample_count: u64,
    /// Live runtime tasks when the monitor was stopped.
    pub active_tasks: usize,
}

#[derive(Debug, Default)]
struct Accumulator {
    cpu_sum: f64,
    cpu_samples: u64,
    memory_sum: f64,
    memory_samples: u64,
    memory_peak: f64,
}

impl Accumulator {
    fn record(&mut self, memory_mb: f64, cpu_percent: Option<f64>) {
        self.memory_sum += memory_mb;
        self.memory_samples += 1;
        if memory_mb > self.memory_peak {
            self.memory_peak = memory_mb;
        }
        if let Some(cpu) = cpu_percent {
            self.cpu_sum += cpu;
            self.cpu_samples += 1;
        }
    }

    fn reduce(&self) -> ResourceStats {
        let mean = |sum: f64, n: u64| if n == 0 { 0.0 } else { sum / n as f64 };
        ResourceStats {
            cpu_avg_percent: mean(self.cpu_sum, self.cpu_samples),
            memory_avg_mb: mean(self.memory_sum, self.memory_samples),
            memory_peak_mb: self.memory_peak,
            sample_count: self.memory_samples,
            active_tasks: 0,
        }
    }
}

/// Samples process CPU and memory on a fixed interval.
pub struct ResourceMonitor {
    probe: Box<dyn ProcessProbe>,
    interval: Duration,
}

impl ResourceMonitor {
    /// Monitor the current process.
    pub fn new(interval: Duration) -> Result<Self, ResourceError> {
        Ok(Self::with_probe(SysinfoProbe::new()?, interval))
    }

    /// Monitor using a custom probe. A zero interval is raised to 1ms.
    pub fn with_probe(probe: impl ProcessProbe + 'static, interval: Duration) -> Self {
        Self {
            probe: Box::new(probe),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Spawn the sampler. It runs until the handle is stopped or `cancel` fires.
    pub fn start(self, cancel: &CancellationToken) -> MonitorHandle {
        let token = cancel.child_token();
        let accumulator = Arc::new(Mutex::new(Accumulator::default()));
        let task = tokio::spawn(sample_loop(
            self.probe,
            self.interval,
            token.clone(),
            Arc::clone(&accumulator),
        ));

        MonitorHandle {
            cancel: token,
            task,
            accumulator,
        }
    }
}

async fn sample_loop(
    mut probe: Box<dyn ProcessProbe>,
    interval: Duration,
    cancel: CancellationToken,
    accumulator: Arc<Mutex<Accumulator>>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut previous: Option<(Instant, Option<Duration>)> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = Instant::now();
        let Some(snapshot) = probe.snapshot() else {
            continue;
        };

        let cpu_percent = match (previous, snapshot.cpu_time) {
            (Some((then, Some(prev_cpu))), Some(cpu)) => {
                let wall = now.duration_since(then).as_secs_f64();
                (wall > 0.0).then(|| 100.0 * cpu.saturating_sub(prev_cpu).as_secs_f64() / wall)
            }
            _ => None,
        };

        accumulator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .record(snapshot.rss_bytes as f64 / BYTES_PER_MB, cpu_percent);
        previous = Some((now, snapshot.cpu_time));
    }

    debug!("Resource sampler stopped");
}

/// Handle to a running sampler.
pub struct MonitorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    accumulator: Arc<Mutex<Accumulator>>,
}

impl MonitorHandle {
    /// Stop sampling and reduce the observations.
    pub async fn stop(self) -> ResourceStats {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Resource sampler failed: {}", e);
        }

        let mut stats = self
            .accumulator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .reduce();
        stats.active_tasks = active_tasks();
        stats
    }
}

fn active_tasks() -> usize {
    tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_alive_tasks())
        .unwrap_or(0)
}
