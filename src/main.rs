//! Command-line interface for grpc-rest-bench
//!
//! # Usage Examples
//!
//! ## Benchmark
//! ```bash
//! # Query benchmark, account ids loaded from PostgreSQL, results stored there
//! grpc-rest-bench run \
//!   --scenario query --protocol rest \
//!   --concurrency 50 --duration 1m \
//!   --sink postgresql \
//!   --postgresql-connection-string "host=localhost user=benchmark dbname=grpc_benchmark"
//!
//! # Dry run without a server
//! grpc-rest-bench run --protocol simulated --targets 0.0.1 --duration 5s --table
//! ```
//!
//! ## Timing Files
//! ```bash
//! grpc-rest-bench timing generate --count 10000 --mean-ms 100 --stddev-ms 50 --output timing.json
//! grpc-rest-bench timing show timing.json
//! ```
//!
//! ## Stored Results
//! ```bash
//! grpc-rest-bench stats --scenario query --limit 10
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use grpc_rest_bench::bench::{self, RunArgs, StatsArgs, TimingGenerateArgs};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "grpc-rest-bench")]
#[command(about = "Load generator and latency benchmark for gRPC and REST services")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one timed benchmark and report its latency distribution
    Run(RunArgs),

    /// Generate or inspect inter-arrival timing files
    Timing {
        #[command(subcommand)]
        command: TimingCommands,
    },

    /// Show stored benchmark runs from PostgreSQL
    Stats(StatsArgs),
}

#[derive(Subcommand)]
enum TimingCommands {
    /// Write a synthetic log-normal timing distribution
    Generate(TimingGenerateArgs),

    /// Print provenance and summary statistics of a timing file
    Show {
        /// Timing file to inspect
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let shutdown = shutdown_on_interrupt();
            let outcome = bench::run_benchmark(&args, &shutdown)
                .await
                .context("Benchmark failed")?;
            if let Some(run_id) = outcome.run_id {
                info!("Benchmark complete (run_id: {run_id})");
            }
        }
        Commands::Timing { command } => match command {
            TimingCommands::Generate(args) => {
                bench::timing::generate(&args)?;
            }
            TimingCommands::Show { path } => {
                bench::timing::show(&path)?;
            }
        },
        Commands::Stats(args) => {
            bench::stats::show(&args).await?;
        }
    }

    Ok(())
}

/// Cancel the returned token on the first Ctrl+C.
fn shutdown_on_interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let shutdown = token.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt signal, stopping benchmark");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to install Ctrl+C handler: {e}"),
        }
    });

    token
}
