//! Benchmark subcommands.

pub mod args;
pub mod run;
pub mod stats;
pub mod targets;
pub mod timing;

pub use args::{
    PostgresOpts, Protocol, RunArgs, Scenario, SinkKind, StatsArgs, TimingGenerateArgs,
};
pub use run::{run_benchmark, BenchOutcome};
