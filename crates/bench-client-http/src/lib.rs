//! REST adapter for the benchmark runner.
//!
//! - Queries: `GET {base}/api/v1/accounts/{id}/balance`
//! - Streams: `GET {base}/api/v1/transactions/stream?rate=N` as server-sent events

pub mod client;
pub mod sse;

pub use client::{HttpClient, QUERY_TIMEOUT};
pub use sse::{SseLineBuffer, MAX_PENDING_LINE};
