//! Work client capability consumed by the runner.
//!
//! Transport adapters (REST, gRPC, simulated) implement [`WorkClient`]. The
//! runner only needs two operations: perform one request, and open one
//! long-lived event subscription.

use crate::error::ClientError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default buffer for adapter-side event channels.
pub const DEFAULT_STREAM_BUFFER: usize = 100;

/// One event received on a subscription.
#[derive(Debug, Clone, Copy)]
pub struct StreamEvent {
    /// Monotonic receipt time, used for inter-arrival latency.
    pub received_at: Instant,
    /// Wall-clock receipt time.
    pub timestamp: DateTime<Utc>,
}

impl StreamEvent {
    /// An event received right now.
    pub fn now() -> Self {
        Self {
            received_at: Instant::now(),
            timestamp: Utc::now(),
        }
    }
}

/// Item delivered on an [`EventStream`].
#[derive(Debug, Clone)]
pub enum StreamItem {
    Event(StreamEvent),
    /// Terminal error. Adapters send at most one and then close the channel.
    Error(ClientError),
}

/// Receiving half of a subscription.
///
/// The stream has ended once `recv` returns `None`.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<StreamItem>,
}

impl EventStream {
    /// Create a bounded stream, returning the adapter's sending half.
    pub fn channel(buffer: usize) -> (mpsc::Sender<StreamItem>, EventStream) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, EventStream { rx })
    }

    /// A stream that yields one error and then ends.
    pub fn failed(error: ClientError) -> EventStream {
        let (tx, stream) = Self::channel(1);
        // capacity 1 and fresh channel: cannot fail
        let _ = tx.try_send(StreamItem::Error(error));
        stream
    }

    /// Next item, or `None` when the subscription has closed.
    pub async fn recv(&mut self) -> Option<StreamItem> {
        self.rx.recv().await
    }
}

/// Capability to perform units of work against the service under test.
#[async_trait]
pub trait WorkClient: Send + Sync {
    /// Perform one request-response unit of work against `target`.
    async fn execute_query(&self, target: &str) -> Result<(), ClientError>;

    /// Open one event subscription. `rate_hint` is a server-side pacing
    /// hint in events per second, 0 meaning unlimited. The adapter must stop
    /// producing once `cancel` fires or the stream is dropped.
    async fn open_stream(&self, rate_hint: u32, cancel: CancellationToken) -> EventStream;

    /// Release held connection resources.
    async fn close(&self) -> Result<(), ClientError>;
}
