//! Worker pool that generates load and emits samples.

use crate::client::{StreamItem, WorkClient};
use crate::config::{ReplaySharing, RunnerConfig};
use crate::error::RunnerError;
use crate::sample::Sample;
use bench_timing::TimingReplay;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receiving half of the sample channel, handed to exactly one collector.
pub type SampleReceiver = mpsc::Receiver<Sample>;

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of workers started.
    pub workers: usize,
    /// Samples successfully handed to the channel.
    pub samples_sent: u64,
}

/// Load generator managing a fixed-size worker pool.
pub struct Runner {
    client: Arc<dyn WorkClient>,
    targets: Arc<[String]>,
    config: RunnerConfig,
    replay: Option<TimingReplay>,
    tx: mpsc::Sender<Sample>,
    rx: Option<SampleReceiver>,
}

impl Runner {
    /// Create a runner. Fails if the configuration is invalid.
    ///
    /// `targets` is the pool of addressable targets for the query scenario;
    /// the stream scenario ignores it.
    pub fn new(
        client: Arc<dyn WorkClient>,
        targets: Vec<String>,
        config: RunnerConfig,
    ) -> Result<Self, RunnerError> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.channel_capacity);
        Ok(Self {
            client,
            targets: targets.into(),
            config,
            replay: None,
            tx,
            rx: Some(rx),
        })
    }

    /// Attach a timing replay used to pace query workers.
    pub fn with_timing_replay(mut self, replay: TimingReplay) -> Self {
        self.replay = Some(replay);
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Take the sample receiver. Only the first call succeeds.
    pub fn results(&mut self) -> Result<SampleReceiver, RunnerError> {
        self.rx.take().ok_or(RunnerError::ResultsAlreadyTaken)
    }

    /// Run the request-response scenario until `cancel` fires.
    ///
    /// Returns once every worker has exited; the sample channel is closed
    /// at that point.
    pub async fn run_query(self, cancel: CancellationToken) -> Result<RunSummary, RunnerError> {
        if self.targets.is_empty() {
            return Err(RunnerError::NoTargets);
        }

        let Runner {
            client,
            targets,
            config,
            replay,
            tx,
            rx,
        } = self;
        if rx.is_some() {
            warn!("Sample receiver was never taken; samples will be discarded");
        }
        drop(rx);

        let pacers = build_pacers(replay, &config);
        let sent = Arc::new(AtomicU64::new(0));
        let mut workers = JoinSet::new();

        info!(
            "Starting {} query workers over {} targets",
            config.concurrency,
            targets.len()
        );
        for (id, pacer) in pacers.into_iter().enumerate() {
            let worker = Worker::new(id, tx.clone(), Arc::clone(&sent));
            workers.spawn(worker.run_query(
                Arc::clone(&client),
                Arc::clone(&targets),
                pacer,
                cancel.clone(),
            ));
        }
        drop(tx);

        finish(&mut workers, config.concurrency, &sent).await
    }

    /// Run the streaming scenario until every subscription ends or `cancel` fires.
    pub async fn run_stream(self, cancel: CancellationToken) -> Result<RunSummary, RunnerError> {
        let Runner {
            client,
            config,
            tx,
            rx,
            ..
        } = self;
        if rx.is_some() {
            warn!("Sample receiver was never taken; samples will be discarded");
        }
        drop(rx);

        let sent = Arc::new(AtomicU64::new(0));
        let mut workers = JoinSet::new();

        info!(
            "Starting {} stream workers (rate hint: {})",
            config.concurrency,
            if config.rate == 0 {
                "unlimited".to_string()
            } else {
                format!("{}/s", config.rate)
            }
        );
        for id in 0..config.concurrency {
            let worker = Worker::new(id, tx.clone(), Arc::clone(&sent));
            workers.spawn(worker.run_stream(Arc::clone(&client), config.rate, cancel.clone()));
        }
        drop(tx);

        finish(&mut workers, config.concurrency, &sent).await
    }
}

/// Join every worker, then report. All senders are gone once this returns.
async fn finish(
    workers: &mut JoinSet<()>,
    concurrency: usize,
    sent: &AtomicU64,
) -> Result<RunSummary, RunnerError> {
    let mut panicked = 0;
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result {
            if e.is_panic() {
                warn!("Worker panicked: {}", e);
                panicked += 1;
            }
        }
    }

    let summary = RunSummary {
        workers: concurrency,
        samples_sent: sent.load(Ordering::Relaxed),
    };
    info!(
        "All {} workers exited, {} samples emitted",
        summary.workers, summary.samples_sent
    );

    if panicked > 0 {
        return Err(RunnerError::WorkerPanicked(panicked));
    }
    Ok(summary)
}

/// Pacing source for one worker.
enum Pacer {
    Unpaced,
    Owned(TimingReplay),
    Shared(Arc<Mutex<TimingReplay>>),
}

impl Pacer {
    fn next_delay(&mut self) -> Option<Duration> {
        match self {
            Pacer::Unpaced => None,
            Pacer::Owned(replay) => Some(replay.next_delay()),
            Pacer::Shared(replay) => Some(
                replay
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .next_delay(),
            ),
        }
    }
}

fn build_pacers(replay: Option<TimingReplay>, config: &RunnerConfig) -> Vec<Pacer> {
    let workers = config.concurrency;
    match (replay, config.replay_sharing) {
        (None, _) => (0..workers).map(|_| Pacer::Unpaced).collect(),
        (Some(mut replay), ReplaySharing::PerWorker) => (0..workers)
            .map(|id| Pacer::Owned(replay.fork(id, workers)))
            .collect(),
        (Some(replay), ReplaySharing::Shared) => {
            let shared = Arc::new(Mutex::new(replay));
            (0..workers)
                .map(|_| Pacer::Shared(Arc::clone(&shared)))
                .collect()
        }
    }
}

struct Worker {
    id: usize,
    tx: mpsc::Sender<Sample>,
    sent: Arc<AtomicU64>,
}

impl Worker {
    fn new(id: usize, tx: mpsc::Sender<Sample>, sent: Arc<AtomicU64>) -> Self {
        Self { id, tx, sent }
    }

    async fn run_query(
        self,
        client: Arc<dyn WorkClient>,
        targets: Arc<[String]>,
        mut pacer: Pacer,
        cancel: CancellationToken,
    ) {
        let mut rng = StdRng::from_entropy();

        loop {
            if cancel.is_cancelled() {
                break;
            }

            if let Some(delay) = pacer.next_delay() {
                if !delay.is_zero() {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }

            let target = &targets[rng.gen_range(0..targets.len())];
            let timestamp = Utc::now();
            let start = Instant::now();
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = client.execute_query(target) => outcome,
            };
            let sample = Sample::from_outcome(start.elapsed(), outcome, timestamp);

            if !self.emit(sample, &cancel).await {
                break;
            }
        }

        debug!("Query worker {} exited", self.id);
    }

    async fn run_stream(self, client: Arc<dyn WorkClient>, rate: u32, cancel: CancellationToken) {
        let mut stream = tokio::select! {
            _ = cancel.cancelled() => return,
            stream = client.open_stream(rate, cancel.clone()) => stream,
        };
        let mut last_event: Option<Instant> = None;

        loop {
            let item = tokio::select! {
                _ = cancel.cancelled() => break,
                item = stream.recv() => item,
            };

            match item {
                None => break,
                Some(StreamItem::Event(event)) => {
                    let latency = last_event
                        .map(|prev| event.received_at.saturating_duration_since(prev))
                        .unwrap_or(Duration::ZERO);
                    last_event = Some(event.received_at);

                    if !self
                        .emit(Sample::success(latency, event.timestamp), &cancel)
                        .await
                    {
                        break;
                    }
                }
                Some(StreamItem::Error(error)) => {
                    if !cancel.is_cancelled() {
                        debug!("Stream worker {} terminated: {}", self.id, error);
                        self.emit(Sample::failure(Duration::ZERO, error, Utc::now()), &cancel)
                            .await;
                    }
                    break;
                }
            }
        }

        debug!("Stream worker {} exited", self.id);
    }

    /// Hand a sample to the collector. Returns false when the worker should stop.
    async fn emit(&self, sample: Sample, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            sent = self.tx.send(sample) => match sent {
                Ok(()) => {
                    self.sent.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(_) => false,
            },
            _ = cancel.cancelled() => false,
        }
    }
}
