//! End-to-end benchmark runs against the in-process simulated client.

use bench_results::{JsonlSink, LatencySummary, RunId};
use clap::Parser;
use grpc_rest_bench::bench::{run_benchmark, RunArgs};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
struct TestCli {
    #[command(flatten)]
    run: RunArgs,
}

fn run_args(extra: &[&str]) -> RunArgs {
    let mut argv = vec!["grpc-rest-bench", "--protocol", "simulated"];
    argv.extend_from_slice(extra);
    TestCli::parse_from(argv).run
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_query_run_persists_to_jsonl() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let sink_dir = dir.path().join("results");
    let report = dir.path().join("summary.json");
    let args = run_args(&[
        "--targets",
        "0.0.1001,0.0.1002,0.0.1003",
        "--concurrency",
        "4",
        "--duration",
        "300ms",
        "--resource-interval-ms",
        "20",
        "--sink",
        "jsonl",
        "--sink-dir",
        sink_dir.to_str().unwrap(),
        "--report-json",
        report.to_str().unwrap(),
    ]);

    let started = Instant::now();
    let outcome = run_benchmark(&args, &CancellationToken::new()).await?;
    assert!(started.elapsed() < Duration::from_secs(5));

    let summary = &outcome.summary;
    assert_eq!(summary.scenario, "query");
    assert_eq!(summary.protocol, "simulated");
    assert_eq!(summary.client, "rust");
    assert_eq!(summary.concurrency, 4);
    assert!(summary.total_requests > 0);
    assert_eq!(summary.failed_requests, 0);
    assert_eq!(summary.error_rate, 0.0);
    assert!(summary.p50_ms >= 1.0);
    assert!(summary.p50_ms <= summary.p99_ms);
    assert!(summary.resources.is_some());

    let written: LatencySummary = serde_json::from_str(&std::fs::read_to_string(&report)?)?;
    assert_eq!(written.total_requests, summary.total_requests);

    assert_eq!(outcome.run_id, Some(RunId(1)));
    let sink = JsonlSink::new(&sink_dir)?;
    let stored = sink.read_samples(RunId(1))?;
    assert_eq!(stored.len() as u64, summary.total_requests);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_are_counted_not_fatal() -> anyhow::Result<()> {
    let args = run_args(&[
        "--targets",
        "0.0.1",
        "--concurrency",
        "2",
        "--duration",
        "200ms",
        "--simulated-failure-rate",
        "1.0",
        "--resource-interval-ms",
        "0",
    ]);

    let outcome = run_benchmark(&args, &CancellationToken::new()).await?;
    let summary = outcome.summary;
    assert!(summary.total_requests > 0);
    assert_eq!(summary.successful_requests, 0);
    assert_eq!(summary.error_rate, 100.0);
    assert_eq!(summary.p50_ms, 0.0);
    assert!(summary.resources.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stream_run() -> anyhow::Result<()> {
    let args = run_args(&[
        "--scenario",
        "stream",
        "--concurrency",
        "3",
        "--rate",
        "200",
        "--duration",
        "300ms",
    ]);

    let outcome = run_benchmark(&args, &CancellationToken::new()).await?;
    let summary = outcome.summary;
    assert_eq!(summary.scenario, "stream");
    assert!(summary.total_requests >= 3);
    assert_eq!(summary.failed_requests, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stream_rate_limit_recorded_only_when_limited() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let sink_dir = dir.path().join("results");
    for rate in ["0", "50"] {
        let args = run_args(&[
            "--scenario",
            "stream",
            "--concurrency",
            "2",
            "--rate",
            rate,
            "--duration",
            "100ms",
            "--resource-interval-ms",
            "0",
            "--sink",
            "jsonl",
            "--sink-dir",
            sink_dir.to_str().unwrap(),
        ]);
        run_benchmark(&args, &CancellationToken::new()).await?;
    }

    let sink = JsonlSink::new(&sink_dir)?;
    let runs: Vec<serde_json::Value> = std::fs::read_to_string(sink.runs_path())?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(runs.len(), 2);
    assert!(runs[0]["rate_limit"].is_null());
    assert_eq!(runs[1]["rate_limit"], 50);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_replayed_run_with_shared_cursor() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let timing = dir.path().join("timing.json");
    bench_timing::generate_synthetic_seeded(200, 20.0, 5.0, 11)?.save(&timing)?;

    let args = run_args(&[
        "--targets",
        "0.0.1",
        "--concurrency",
        "4",
        "--duration",
        "300ms",
        "--replay-timing",
        timing.to_str().unwrap(),
        "--replay-mode",
        "sequential",
        "--replay-sharing",
        "shared",
    ]);

    let outcome = run_benchmark(&args, &CancellationToken::new()).await?;
    // four workers pacing ~20ms each manage roughly 60 requests; unpaced
    // they would run into the thousands
    assert!(outcome.summary.total_requests > 0);
    assert!(outcome.summary.total_requests < 150);
    Ok(())
}

#[tokio::test]
async fn test_interrupted_before_start_reports_empty_run() -> anyhow::Result<()> {
    let args = run_args(&["--targets", "0.0.1", "--duration", "10s"]);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let started = Instant::now();
    let outcome = run_benchmark(&args, &shutdown).await?;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.summary.total_requests, 0);
    assert_eq!(outcome.summary.throughput, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_setup_errors() {
    let grpc = TestCli::parse_from(["grpc-rest-bench", "--protocol", "grpc", "--targets", "a"]).run;
    let err = run_benchmark(&grpc, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("grpc"));

    let zero_workers = run_args(&["--targets", "a", "--concurrency", "0"]);
    assert!(run_benchmark(&zero_workers, &CancellationToken::new())
        .await
        .is_err());

    let zero_duration = run_args(&["--targets", "a", "--duration", "0s"]);
    assert!(run_benchmark(&zero_duration, &CancellationToken::new())
        .await
        .is_err());

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let bad_timing = run_args(&["--targets", "a", "--replay-timing", missing.to_str().unwrap()]);
    let err = run_benchmark(&bad_timing, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load timing data"));
}

#[tokio::test]
async fn test_query_without_targets_fails() {
    if std::env::var("BENCH_POSTGRESQL_CONNECTION_STRING").is_ok() {
        eprintln!("BENCH_POSTGRESQL_CONNECTION_STRING is set, skipping");
        return;
    }
    let args = run_args(&["--duration", "1s"]);
    let err = run_benchmark(&args, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("No targets"));
}
