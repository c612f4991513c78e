//! Command-line arguments for the benchmark subcommands.

use crate::config::parse_duration;
use bench_runner::ReplaySharing;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Workload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Unary balance lookups against the target accounts
    #[value(alias = "balance")]
    Query,
    /// Transaction event subscriptions
    Stream,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Query => "query",
            Scenario::Stream => "stream",
        }
    }
}

/// Transport under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// REST over HTTP/1.1 with server-sent events for streams
    Rest,
    /// gRPC (requires generated protobuf stubs)
    Grpc,
    /// In-process client with injected latency, for dry runs
    Simulated,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Rest => "rest",
            Protocol::Grpc => "grpc",
            Protocol::Simulated => "simulated",
        }
    }
}

/// Where a finished run is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Keep records in memory only
    None,
    /// Append JSON lines under --sink-dir
    Jsonl,
    /// PostgreSQL benchmark_runs / benchmark_samples tables
    #[value(name = "postgresql")]
    PostgreSQL,
}

/// PostgreSQL connection options shared by `run` and `stats`.
#[derive(Args, Debug, Clone, Default)]
pub struct PostgresOpts {
    /// PostgreSQL connection string for results and account ids
    #[arg(long, env = "BENCH_POSTGRESQL_CONNECTION_STRING")]
    pub postgresql_connection_string: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Workload to generate
    #[arg(long, value_enum, default_value_t = Scenario::Query)]
    pub scenario: Scenario,

    /// Protocol to benchmark
    #[arg(long, value_enum, default_value_t = Protocol::Rest)]
    pub protocol: Protocol,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// How long to generate load (e.g. "30s", "2m", "500ms")
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub duration: Duration,

    /// Events per second requested from the server for stream runs (0 = server default)
    #[arg(long, default_value_t = 0)]
    pub rate: u32,

    /// Base URL of the REST service
    #[arg(long, env = "BENCH_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Comma-separated account ids to query
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// File with one account id per line ('#' starts a comment)
    #[arg(long, value_name = "PATH")]
    pub targets_file: Option<PathBuf>,

    /// Inter-arrival timing file used to pace workers
    #[arg(long, value_name = "PATH")]
    pub replay_timing: Option<PathBuf>,

    /// Replay mode: "sequential" or "sample"
    #[arg(long, default_value = "sample")]
    pub replay_mode: String,

    /// Divide every replayed delay by this factor
    #[arg(long, default_value_t = 1.0)]
    pub replay_speedup: f64,

    /// Whether workers get their own replay cursor or share one
    #[arg(long, default_value = "per-worker")]
    pub replay_sharing: ReplaySharing,

    /// Results storage backend
    #[arg(long, value_enum, default_value_t = SinkKind::None)]
    pub sink: SinkKind,

    /// Output directory for the jsonl sink
    #[arg(long, default_value = "bench-results")]
    pub sink_dir: PathBuf,

    /// PostgreSQL options
    #[command(flatten)]
    pub postgres: PostgresOpts,

    /// Write the latency summary as JSON to this file
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Resource sampling interval in milliseconds (0 disables sampling)
    #[arg(long, default_value_t = 100)]
    pub resource_interval_ms: u64,

    /// Client implementation label stored with the run
    #[arg(long, default_value = "rust")]
    pub client_label: String,

    /// Print the summary as a table instead of plain text
    #[arg(long)]
    pub table: bool,

    /// Latency of each simulated request in milliseconds
    #[arg(long, default_value_t = 1)]
    pub simulated_latency_ms: u64,

    /// Fraction of simulated requests that fail (0.0 - 1.0)
    #[arg(long, default_value_t = 0.0)]
    pub simulated_failure_rate: f64,
}

impl RunArgs {
    pub fn resource_interval(&self) -> Option<Duration> {
        (self.resource_interval_ms > 0).then(|| Duration::from_millis(self.resource_interval_ms))
    }
}

#[derive(Args, Debug, Clone)]
pub struct TimingGenerateArgs {
    /// Number of inter-arrival delays to generate
    #[arg(long, default_value_t = 10_000)]
    pub count: usize,

    /// Mean delay in milliseconds
    #[arg(long, default_value_t = 100.0)]
    pub mean_ms: f64,

    /// Standard deviation in milliseconds
    #[arg(long, default_value_t = 50.0)]
    pub stddev_ms: f64,

    /// Output path for the timing file
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Seed for a reproducible distribution
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    /// PostgreSQL options
    #[command(flatten)]
    pub postgres: PostgresOpts,

    /// Only show runs of this scenario
    #[arg(long)]
    pub scenario: Option<String>,

    /// Only show runs of this protocol
    #[arg(long)]
    pub protocol: Option<String>,

    /// Only show runs from this client label
    #[arg(long)]
    pub client: Option<String>,

    /// Only show this run
    #[arg(long)]
    pub run_id: Option<i64>,

    /// Maximum number of runs to show, newest first
    #[arg(long, default_value_t = 20)]
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    #[test]
    fn test_run_defaults() {
        let cli = TestCli::try_parse_from(["bench"]).unwrap();
        let args = cli.run;
        assert_eq!(args.scenario, Scenario::Query);
        assert_eq!(args.protocol, Protocol::Rest);
        assert_eq!(args.concurrency, 10);
        assert_eq!(args.duration, Duration::from_secs(30));
        assert_eq!(args.replay_sharing, ReplaySharing::PerWorker);
        assert_eq!(args.sink, SinkKind::None);
        assert_eq!(args.resource_interval(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_run_flags() {
        let cli = TestCli::try_parse_from([
            "bench",
            "--scenario",
            "balance",
            "--protocol",
            "simulated",
            "--duration",
            "750ms",
            "--targets",
            "0.0.1,0.0.2",
            "--replay-sharing",
            "shared",
            "--sink",
            "postgresql",
            "--resource-interval-ms",
            "0",
        ])
        .unwrap();
        let args = cli.run;
        assert_eq!(args.scenario, Scenario::Query);
        assert_eq!(args.protocol, Protocol::Simulated);
        assert_eq!(args.duration, Duration::from_millis(750));
        assert_eq!(args.targets, vec!["0.0.1", "0.0.2"]);
        assert_eq!(args.replay_sharing, ReplaySharing::Shared);
        assert_eq!(args.sink, SinkKind::PostgreSQL);
        assert_eq!(args.resource_interval(), None);
    }

    #[test]
    fn test_run_rejects_bad_values() {
        assert!(TestCli::try_parse_from(["bench", "--duration", "soon"]).is_err());
        assert!(TestCli::try_parse_from(["bench", "--replay-sharing", "pooled"]).is_err());
        assert!(TestCli::try_parse_from(["bench", "--protocol", "soap"]).is_err());
    }
}
