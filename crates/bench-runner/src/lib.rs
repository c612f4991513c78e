//! Worker-pool load generator.
//!
//! The runner drives a fixed number of workers against a [`WorkClient`]:
//! 1. Each worker optionally waits for a pacing delay from a `TimingReplay`
//! 2. It performs one unit of work (a query, or one event of a stream)
//! 3. It emits a timestamped [`Sample`] onto a bounded channel
//!
//! Every suspension point races a shared `CancellationToken`, so a deadline
//! or an interrupt ends the run promptly. The output channel closes exactly
//! once, after every worker has exited.
//!
//! # Example
//!
//! ```ignore
//! use bench_runner::{Runner, RunnerConfig, SimulatedClient};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let client = Arc::new(SimulatedClient::new());
//! let mut runner = Runner::new(client, vec!["0.0.1001".into()], RunnerConfig::new(8))?;
//! let mut samples = runner.results()?;
//! let cancel = CancellationToken::new();
//! let run = tokio::spawn(runner.run_query(cancel.clone()));
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod runner;
pub mod sample;
pub mod simulated;

pub use client::{EventStream, StreamEvent, StreamItem, WorkClient, DEFAULT_STREAM_BUFFER};
pub use config::{ReplaySharing, RunnerConfig, DEFAULT_CHANNEL_CAPACITY};
pub use error::{ClientError, RunnerError};
pub use runner::{RunSummary, Runner, SampleReceiver};
pub use sample::Sample;
pub use simulated::SimulatedClient;
