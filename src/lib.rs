//! grpc-rest-bench library
//!
//! Load generation and latency measurement for services exposing the same
//! API over gRPC and REST.
//!
//! # Workspace Crates
//!
//! - `bench_timing` - inter-arrival timing data and replay
//! - `bench_runner` - worker pool, work client trait, simulated client
//! - `bench_resources` - process CPU and memory sampling
//! - `bench_results` - statistics, reports and result sinks
//! - `bench_sink_postgresql` - PostgreSQL result storage
//! - `bench_client_http` - REST client adapter
//!
//! # CLI Usage
//!
//! ```bash
//! # 30 second query benchmark against the REST service
//! grpc-rest-bench run --scenario query --protocol rest --concurrency 50 \
//!   --targets 0.0.1001,0.0.1002 --duration 30s
//!
//! # Stream benchmark storing results in PostgreSQL
//! grpc-rest-bench run --scenario stream --rate 100 --sink postgresql \
//!   --postgresql-connection-string "host=localhost user=benchmark dbname=grpc_benchmark"
//!
//! # Pace workers with a synthetic inter-arrival distribution
//! grpc-rest-bench timing generate --count 10000 --mean-ms 50 --stddev-ms 20 --output timing.json
//! grpc-rest-bench run --replay-timing timing.json --replay-mode sequential --replay-speedup 10
//! ```

pub mod bench;
pub mod config;
