//! End-to-end worker pool behaviour against the simulated client.

use async_trait::async_trait;
use bench_runner::{
    ClientError, EventStream, ReplaySharing, Runner, RunnerConfig, RunnerError, Sample,
    SampleReceiver, SimulatedClient, WorkClient,
};
use bench_timing::{ReplayMode, TimingData, TimingReplay};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn targets() -> Vec<String> {
    (0..5).map(|i| format!("0.0.{}", 2000 + i)).collect()
}

async fn drain(mut rx: SampleReceiver) -> Vec<Sample> {
    let mut samples = Vec::new();
    while let Some(sample) = rx.recv().await {
        samples.push(sample);
    }
    samples
}

fn cancel_after(duration: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        token.cancel();
    });
    cancel
}

#[tokio::test]
async fn test_query_run_closes_channel_after_cancel() {
    let client = Arc::new(SimulatedClient::new().with_latency(Duration::from_millis(2)));
    let mut runner = Runner::new(client.clone(), targets(), RunnerConfig::new(4)).unwrap();
    let rx = runner.results().unwrap();
    let collector = tokio::spawn(drain(rx));

    let summary = runner
        .run_query(cancel_after(Duration::from_millis(100)))
        .await
        .unwrap();
    let samples = collector.await.unwrap();

    assert_eq!(summary.workers, 4);
    assert_eq!(summary.samples_sent, samples.len() as u64);
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.is_success()));
    assert!(samples.iter().all(|s| s.latency() >= Duration::from_millis(2)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_collector_applies_backpressure() {
    let client = Arc::new(SimulatedClient::new().with_latency(Duration::from_millis(1)));
    let config = RunnerConfig::new(8).with_channel_capacity(1);
    let mut runner = Runner::new(client.clone(), targets(), config).unwrap();
    let mut rx = runner.results().unwrap();

    let collector = tokio::spawn(async move {
        let mut received = 0u64;
        while rx.recv().await.is_some() {
            tokio::time::sleep(Duration::from_millis(2)).await;
            received += 1;
        }
        received
    });

    // workers blocked on a full channel must still observe cancellation
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run_query(cancel_after(Duration::from_millis(200))),
    )
    .await
    .expect("run did not finish after cancellation")
    .unwrap();
    let received = collector.await.unwrap();

    assert_eq!(summary.workers, 8);
    assert!(received > 0);
    assert_eq!(summary.samples_sent, received);
    // the collector, not the workers, bounds throughput
    assert!(client.queries_executed() <= received + 8 + 1);
}

#[tokio::test]
async fn test_all_failures_are_recorded() {
    let client = Arc::new(
        SimulatedClient::new()
            .with_latency(Duration::from_millis(1))
            .with_failure_rate(1.0),
    );
    let mut runner = Runner::new(client, targets(), RunnerConfig::new(2)).unwrap();
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    runner
        .run_query(cancel_after(Duration::from_millis(50)))
        .await
        .unwrap();
    let samples = collector.await.unwrap();

    assert!(!samples.is_empty());
    assert!(samples
        .iter()
        .all(|s| !s.is_success() && s.error() == Some(&ClientError::Status(503))));
}

#[tokio::test]
async fn test_already_cancelled_run_emits_nothing() {
    let client = Arc::new(SimulatedClient::new());
    let mut runner = Runner::new(client.clone(), targets(), RunnerConfig::new(3)).unwrap();
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = runner.run_query(cancel).await.unwrap();

    assert_eq!(summary.samples_sent, 0);
    assert!(collector.await.unwrap().is_empty());
    assert_eq!(client.queries_executed(), 0);
}

#[tokio::test]
async fn test_replay_pacing_bounds_throughput() {
    // 20ms between requests per worker, 2 workers, ~200ms of run time
    let data = Arc::new(TimingData::from_delays("t", "n", vec![20.0]).unwrap());
    let replay = TimingReplay::new(data, ReplayMode::Sequential, 1.0);
    let client = Arc::new(SimulatedClient::new().with_latency(Duration::ZERO));
    let mut runner = Runner::new(client, targets(), RunnerConfig::new(2))
        .unwrap()
        .with_timing_replay(replay);
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    runner
        .run_query(cancel_after(Duration::from_millis(200)))
        .await
        .unwrap();
    let samples = collector.await.unwrap();

    assert!(!samples.is_empty());
    assert!(samples.len() <= 2 * 11, "got {} samples", samples.len());
}

#[tokio::test]
async fn test_shared_replay_cursor_runs() {
    let data = Arc::new(TimingData::from_delays("t", "n", vec![5.0, 10.0]).unwrap());
    let replay = TimingReplay::new(data, ReplayMode::Sequential, 2.0);
    let client = Arc::new(SimulatedClient::new().with_latency(Duration::ZERO));
    let config = RunnerConfig::new(3).with_replay_sharing(ReplaySharing::Shared);
    let mut runner = Runner::new(client, targets(), config)
        .unwrap()
        .with_timing_replay(replay);
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    let summary = runner
        .run_query(cancel_after(Duration::from_millis(80)))
        .await
        .unwrap();

    assert_eq!(summary.samples_sent, collector.await.unwrap().len() as u64);
    assert!(summary.samples_sent > 0);
}

#[tokio::test]
async fn test_stream_first_sample_per_worker_has_zero_latency() {
    let client = Arc::new(
        SimulatedClient::new()
            .with_event_interval(Duration::from_millis(5))
            .with_stream_events(4),
    );
    let mut runner = Runner::new(client, Vec::new(), RunnerConfig::new(3)).unwrap();
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    // streams end on their own after 4 events each
    let summary = runner.run_stream(CancellationToken::new()).await.unwrap();
    let samples = collector.await.unwrap();

    assert_eq!(summary.samples_sent, 12);
    assert_eq!(samples.len(), 12);
    let zero = samples.iter().filter(|s| s.latency().is_zero()).count();
    assert_eq!(zero, 3);
    assert!(samples.iter().all(|s| s.is_success()));
}

#[tokio::test]
async fn test_stream_error_emits_one_failure_per_worker() {
    let client = Arc::new(
        SimulatedClient::new()
            .with_event_interval(Duration::from_millis(1))
            .fail_stream_after(2),
    );
    let mut runner = Runner::new(client, Vec::new(), RunnerConfig::new(2)).unwrap();
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    runner.run_stream(CancellationToken::new()).await.unwrap();
    let samples = collector.await.unwrap();

    assert_eq!(samples.len(), 6);
    let failures: Vec<&Sample> = samples.iter().filter(|s| !s.is_success()).collect();
    assert_eq!(failures.len(), 2);
    assert!(failures
        .iter()
        .all(|s| s.error_category().as_deref() == Some("stream")));
}

#[tokio::test]
async fn test_stream_run_ends_on_cancel() {
    let client = Arc::new(SimulatedClient::new().with_event_interval(Duration::from_millis(2)));
    let mut runner =
        Runner::new(client, Vec::new(), RunnerConfig::new(2).with_rate(500)).unwrap();
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    runner
        .run_stream(cancel_after(Duration::from_millis(60)))
        .await
        .unwrap();
    let samples = collector.await.unwrap();

    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.is_success()));
}

struct PanickingClient;

#[async_trait]
impl WorkClient for PanickingClient {
    async fn execute_query(&self, _target: &str) -> Result<(), ClientError> {
        panic!("boom");
    }

    async fn open_stream(&self, _rate_hint: u32, _cancel: CancellationToken) -> EventStream {
        EventStream::failed(ClientError::Closed)
    }

    async fn close(&self) -> Result<(), ClientError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_panicking_workers_are_reported() {
    let mut runner = Runner::new(Arc::new(PanickingClient), targets(), RunnerConfig::new(2)).unwrap();
    let collector = tokio::spawn(drain(runner.results().unwrap()));

    let result = runner.run_query(CancellationToken::new()).await;

    assert!(matches!(result, Err(RunnerError::WorkerPanicked(2))));
    // channel still closes
    assert!(collector.await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dropped_receiver_stops_workers() {
    let client = Arc::new(SimulatedClient::new().with_latency(Duration::ZERO));
    let mut runner = Runner::new(client, targets(), RunnerConfig::new(2)).unwrap();
    drop(runner.results().unwrap());

    // no cancellation: workers must exit because nobody is listening
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run_query(CancellationToken::new()),
    )
    .await
    .expect("workers did not exit")
    .unwrap();

    assert_eq!(summary.samples_sent, 0);
}
