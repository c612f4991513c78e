//! PostgreSQL storage for benchmark runs.
//!
//! Runs go to `benchmark_runs`, samples to `benchmark_samples` via binary
//! `COPY`, and the `benchmark_stats` view aggregates both with
//! `percentile_cont`.
//!
//! # Example
//!
//! ```ignore
//! use bench_sink_postgresql::PostgresSink;
//!
//! let sink = PostgresSink::connect("host=localhost user=benchmark dbname=grpc_benchmark").await?;
//! sink.ensure_schema().await?;
//! let run_id = results.persist(&sink, &descriptor).await?;
//! ```

pub mod error;
pub mod logging;
pub mod schema;
pub mod sink;

pub use error::PostgresSinkError;
pub use logging::mask_connection_password;
pub use sink::PostgresSink;
