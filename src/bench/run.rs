//! The `run` subcommand: one timed benchmark from setup to persistence.

use super::args::{Protocol, RunArgs, Scenario, SinkKind};
use super::targets::TargetSource;
use anyhow::Context;
use bench_client_http::HttpClient;
use bench_resources::{MonitorHandle, ResourceMonitor};
use bench_results::{
    format_latency, JsonlSink, LatencySummary, MemorySink, Results, ResultSink, RunDescriptor,
    RunId,
};
use bench_runner::{ReplaySharing, Runner, RunnerConfig, SimulatedClient, WorkClient};
use bench_sink_postgresql::PostgresSink;
use bench_timing::{ReplayMode, TimingData, TimingReplay};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a finished run produced.
#[derive(Debug)]
pub struct BenchOutcome {
    pub summary: LatencySummary,
    /// Set when the sink accepted the run.
    pub run_id: Option<RunId>,
}

/// Execute one benchmark run.
///
/// `shutdown` is the process-wide token; cancelling it (Ctrl+C) ends the
/// run early and the partial results are still reported and persisted.
pub async fn run_benchmark(
    args: &RunArgs,
    shutdown: &CancellationToken,
) -> anyhow::Result<BenchOutcome> {
    if args.duration.is_zero() {
        anyhow::bail!("--duration must be greater than zero");
    }

    let client = build_client(args)?;
    let postgres = connect_postgres(args).await?;
    let sink = build_sink(args, postgres.clone())?;

    let targets = match args.scenario {
        Scenario::Query => {
            let source = TargetSource::select(
                &args.targets,
                args.targets_file.as_ref(),
                postgres.as_deref(),
            );
            let targets = source.load().await?;
            if targets.is_empty() {
                anyhow::bail!(
                    "No targets available for the query scenario: pass --targets, --targets-file or --postgresql-connection-string"
                );
            }
            targets
        }
        Scenario::Stream => Vec::new(),
    };

    let config = RunnerConfig::new(args.concurrency)
        .with_rate(args.rate)
        .with_replay_sharing(args.replay_sharing);
    let mut runner = Runner::new(Arc::clone(&client), targets, config)
        .context("Invalid runner configuration")?;
    if let Some(replay) = load_replay(args)? {
        if args.scenario == Scenario::Stream {
            warn!("Timing replay only paces query workers; ignoring it for the stream scenario");
        } else {
            runner = runner.with_timing_replay(replay);
        }
    }
    let receiver = runner.results().context("Failed to take sample receiver")?;

    let cancel = shutdown.child_token();
    let deadline = spawn_deadline(args.duration, cancel.clone());
    let monitor = start_monitor(args, &cancel);

    info!(
        "Running {} benchmark over {} with {} workers for {:?}",
        args.scenario.as_str(),
        args.protocol.as_str(),
        args.concurrency,
        args.duration
    );

    let mut results = Results::new();
    results.mark_start();
    let (outcome, collected) = match args.scenario {
        Scenario::Query => tokio::join!(runner.run_query(cancel.clone()), results.collect(receiver)),
        Scenario::Stream => {
            tokio::join!(runner.run_stream(cancel.clone()), results.collect(receiver))
        }
    };
    results.mark_end();

    // streams may all end before the deadline
    cancel.cancel();
    let _ = deadline.await;
    if let Some(monitor) = monitor {
        results.set_resource_stats(monitor.stop().await);
    }
    if let Err(e) = client.close().await {
        warn!("Failed to close client: {e}");
    }

    let summary_run = outcome.context("Benchmark run failed")?;
    debug!(
        "Runner sent {} samples, collector received {}",
        summary_run.samples_sent, collected
    );
    if shutdown.is_cancelled() {
        info!("Run interrupted; reporting partial results");
    }

    let descriptor = RunDescriptor::new(
        args.scenario.as_str(),
        args.protocol.as_str(),
        u32::try_from(args.concurrency).unwrap_or(u32::MAX),
    )
    .with_client(args.client_label.clone())
    // unlimited streams (rate 0) store no limit
    .with_rate_limit((args.scenario == Scenario::Stream && args.rate > 0).then_some(args.rate));

    let summary = results.summary(&descriptor);
    if args.table {
        println!("{}", summary.render_table());
    } else {
        println!("{}", summary.render());
    }

    if let Some(path) = &args.report_json {
        let json = summary.to_json().context("Failed to serialize summary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write summary to {path:?}"))?;
        info!("Summary written to {path:?}");
    }

    let run_id = match results.persist(sink.as_ref(), &descriptor).await {
        Ok(run_id) => {
            info!("Results saved (run_id: {run_id})");
            if args.sink != SinkKind::None {
                print_stored_stats(sink.as_ref(), run_id).await;
            }
            Some(run_id)
        }
        Err(e) => {
            warn!("Failed to persist results: {e}");
            None
        }
    };

    Ok(BenchOutcome { summary, run_id })
}

fn build_client(args: &RunArgs) -> anyhow::Result<Arc<dyn WorkClient>> {
    match args.protocol {
        Protocol::Rest => {
            let client = HttpClient::new(&args.base_url)
                .with_context(|| format!("Failed to create HTTP client for {}", args.base_url))?;
            info!("Benchmarking REST service at {}", client.base_url());
            Ok(Arc::new(client))
        }
        Protocol::Simulated => Ok(Arc::new(
            SimulatedClient::new()
                .with_latency(Duration::from_millis(args.simulated_latency_ms))
                .with_failure_rate(args.simulated_failure_rate),
        )),
        Protocol::Grpc => anyhow::bail!(
            "The grpc protocol is not available in this build: it needs generated protobuf client stubs. Use --protocol rest or --protocol simulated"
        ),
    }
}

/// Connect when the run stores results in PostgreSQL or loads its targets
/// from there.
async fn connect_postgres(args: &RunArgs) -> anyhow::Result<Option<Arc<PostgresSink>>> {
    let wants_targets = args.scenario == Scenario::Query
        && args.targets.is_empty()
        && args.targets_file.is_none();
    let connection_string = args.postgres.postgresql_connection_string.as_deref();

    match (args.sink, connection_string) {
        (SinkKind::PostgreSQL, None) => anyhow::bail!(
            "--sink postgresql requires --postgresql-connection-string"
        ),
        (SinkKind::PostgreSQL, Some(conn)) => {
            let sink = PostgresSink::connect(conn)
                .await
                .context("Failed to connect to PostgreSQL")?;
            sink.ensure_schema()
                .await
                .context("Failed to create benchmark schema")?;
            Ok(Some(Arc::new(sink)))
        }
        (_, Some(conn)) if wants_targets => {
            let sink = PostgresSink::connect(conn)
                .await
                .context("Failed to connect to PostgreSQL")?;
            Ok(Some(Arc::new(sink)))
        }
        _ => Ok(None),
    }
}

fn build_sink(
    args: &RunArgs,
    postgres: Option<Arc<PostgresSink>>,
) -> anyhow::Result<Arc<dyn ResultSink>> {
    match args.sink {
        SinkKind::None => Ok(Arc::new(MemorySink::new())),
        SinkKind::Jsonl => {
            let sink = JsonlSink::new(&args.sink_dir).with_context(|| {
                format!("Failed to prepare results directory {:?}", args.sink_dir)
            })?;
            Ok(Arc::new(sink))
        }
        SinkKind::PostgreSQL => match postgres {
            Some(sink) => Ok(sink as Arc<dyn ResultSink>),
            None => anyhow::bail!("PostgreSQL sink requested but no connection was made"),
        },
    }
}

fn load_replay(args: &RunArgs) -> anyhow::Result<Option<TimingReplay>> {
    let Some(path) = &args.replay_timing else {
        return Ok(None);
    };
    if args.replay_speedup.is_nan() || args.replay_speedup <= 0.0 {
        anyhow::bail!("--replay-speedup must be positive");
    }

    let data = TimingData::load(path)
        .with_context(|| format!("Failed to load timing data from {path:?}"))?;
    let replay = TimingReplay::new(
        Arc::new(data),
        ReplayMode::parse(&args.replay_mode),
        args.replay_speedup,
    );
    info!("{}", replay.summary());
    if args.replay_sharing == ReplaySharing::Shared {
        info!("All workers share one replay cursor");
    }
    Ok(Some(replay))
}

fn spawn_deadline(duration: Duration, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {
                debug!("Run deadline reached");
                cancel.cancel();
            }
        }
    })
}

fn start_monitor(args: &RunArgs, cancel: &CancellationToken) -> Option<MonitorHandle> {
    let interval = args.resource_interval()?;
    match ResourceMonitor::new(interval) {
        Ok(monitor) => Some(monitor.start(cancel)),
        Err(e) => {
            warn!("Resource monitoring disabled: {e}");
            None
        }
    }
}

async fn print_stored_stats(sink: &dyn ResultSink, run_id: RunId) {
    match sink.get_stats(run_id).await {
        Ok(Some(stats)) => println!(
            "\nStored stats (run {}): p50 {}, p90 {}, p99 {}, {}/{} successful",
            stats.run_id,
            format_latency(stats.p50_latency_ms),
            format_latency(stats.p90_latency_ms),
            format_latency(stats.p99_latency_ms),
            stats.successful,
            stats.total_samples
        ),
        Ok(None) => debug!("Sink has no stats for run {run_id}"),
        Err(e) => warn!("Failed to read back stats for run {run_id}: {e}"),
    }
}
