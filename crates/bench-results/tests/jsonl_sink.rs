//! Persisting a run through the JSONL sink and reading it back.

use bench_results::{JsonlSink, MemorySink, ResultSink, Results, RunDescriptor, RunId};
use bench_runner::{ClientError, Sample};
use chrono::{TimeDelta, Utc};
use std::time::Duration;
use tempfile::TempDir;

fn results() -> Results {
    let mut results = Results::new();
    let start = Utc::now();
    results.set_start_time(start);
    for ms in 1..=100u64 {
        results.add(Sample::success(
            Duration::from_micros(ms * 1000 + 250),
            start + TimeDelta::milliseconds(ms as i64),
        ));
    }
    for _ in 0..5 {
        results.add(Sample::failure(
            Duration::from_millis(3),
            ClientError::Status(503),
            start,
        ));
    }
    results.set_end_time(start + TimeDelta::seconds(5));
    results
}

fn to_ms(d: Duration) -> f64 {
    d.as_micros() as f64 / 1000.0
}

#[tokio::test]
async fn test_persist_round_trip() {
    let temp = TempDir::new().unwrap();
    let sink = JsonlSink::new(temp.path()).unwrap();
    let results = results();
    let desc = RunDescriptor::new("query", "rest", 8);

    let run_id = results.persist(&sink, &desc).await.unwrap();
    assert_eq!(run_id, RunId(1));

    let samples = sink.read_samples(run_id).unwrap();
    assert_eq!(samples, results.sample_records());
    assert_eq!(
        samples
            .iter()
            .filter(|s| s.error_type.as_deref() == Some("status_503"))
            .count(),
        5
    );

    let runs = std::fs::read_to_string(sink.runs_path()).unwrap();
    assert_eq!(runs.lines().count(), 1);
    assert!(runs.contains("\"scenario\":\"query\""));
}

#[tokio::test]
async fn test_stats_match_results() {
    let temp = TempDir::new().unwrap();
    let sink = JsonlSink::new(temp.path()).unwrap();
    let results = results();
    let desc = RunDescriptor::new("query", "rest", 8);

    let run_id = results.persist(&sink, &desc).await.unwrap();
    let stats = sink.get_stats(run_id).await.unwrap().unwrap();

    assert_eq!(stats.total_samples, 105);
    assert_eq!(stats.successful, 100);
    assert_eq!(stats.duration_secs, 5);
    assert_eq!(stats.p50_latency_ms, to_ms(results.percentile(50.0)));
    assert_eq!(stats.p90_latency_ms, to_ms(results.percentile(90.0)));
    assert_eq!(stats.p99_latency_ms, to_ms(results.percentile(99.0)));
    assert_eq!(stats.min_latency_ms, to_ms(results.min_latency()));
    assert_eq!(stats.max_latency_ms, to_ms(results.max_latency()));
    assert!((stats.avg_latency_ms - to_ms(results.avg_latency())).abs() < 1e-6);
}

#[tokio::test]
async fn test_samples_for_unknown_run_are_rejected() {
    let temp = TempDir::new().unwrap();
    let sink = JsonlSink::new(temp.path()).unwrap();

    let records = results().sample_records();
    assert!(sink.record_samples(RunId(42), &records).await.is_err());
    assert!(sink.record_samples(RunId(42), &[]).await.is_ok());
}

#[tokio::test]
async fn test_memory_sink_persist() {
    let sink = MemorySink::new();
    let results = results();

    let first = results
        .persist(&sink, &RunDescriptor::new("query", "simulated", 2))
        .await
        .unwrap();
    let second = results
        .persist(&sink, &RunDescriptor::new("stream", "simulated", 2))
        .await
        .unwrap();

    assert_eq!((first, second), (RunId(1), RunId(2)));
    assert_eq!(sink.samples(second).len(), 105);
    assert_eq!(sink.runs()[1].scenario, "stream");
}
