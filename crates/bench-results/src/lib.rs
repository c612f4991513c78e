//! Result reduction, reporting, and persistence.
//!
//! [`Results`] collects the samples a run produces and reduces them into
//! counts, throughput, and latency percentiles. A [`LatencySummary`] renders
//! the reduction for the console or as JSON, and [`ResultSink`]
//! implementations persist the raw records.

pub mod error;
pub mod jsonl;
pub mod records;
pub mod report;
pub mod results;
pub mod sink;

pub use error::SinkError;
pub use jsonl::JsonlSink;
pub use records::{
    BenchmarkRun, BenchmarkStats, RunDescriptor, RunId, SampleRecord, StatsFilter, DEFAULT_CLIENT,
};
pub use report::{format_latency, LatencySummary};
pub use results::Results;
pub use sink::{MemorySink, ResultSink};
