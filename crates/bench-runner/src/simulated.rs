//! In-process work client with configurable latency and failures.
//!
//! Used by the `simulated` protocol and by tests that need a service under
//! test without a network.

use crate::client::{EventStream, StreamEvent, StreamItem, WorkClient, DEFAULT_STREAM_BUFFER};
use crate::error::ClientError;
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Simulated service.
#[derive(Debug)]
pub struct SimulatedClient {
    latency: Duration,
    jitter: Duration,
    failure_rate: f64,
    event_interval: Option<Duration>,
    stream_events: Option<usize>,
    fail_stream_after: Option<usize>,
    closed: AtomicBool,
    queries: AtomicU64,
}

impl Default for SimulatedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedClient {
    /// 1ms per query, no failures, stream paced by the rate hint.
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(1),
            jitter: Duration::ZERO,
            failure_rate: 0.0,
            event_interval: None,
            stream_events: None,
            fail_stream_after: None,
            closed: AtomicBool::new(false),
            queries: AtomicU64::new(0),
        }
    }

    /// Base latency of each query.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Uniform extra latency in `[0, jitter]`.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Fraction of queries that fail with status 503, clamped to `[0, 1]`.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = if rate.is_finite() {
            rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Fixed gap between stream events, overriding the rate hint.
    pub fn with_event_interval(mut self, interval: Duration) -> Self {
        self.event_interval = Some(interval);
        self
    }

    /// End each stream normally after `count` events.
    pub fn with_stream_events(mut self, count: usize) -> Self {
        self.stream_events = Some(count);
        self
    }

    /// Terminate each stream with an error after `count` events.
    pub fn fail_stream_after(mut self, count: usize) -> Self {
        self.fail_stream_after = Some(count);
        self
    }

    /// Number of queries started so far.
    pub fn queries_executed(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn draw(&self) -> (Duration, bool) {
        let mut rng = rand::thread_rng();
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_nanos(rng.gen_range(0..=self.jitter.as_nanos() as u64))
        };
        let fail = self.failure_rate > 0.0 && rng.gen_bool(self.failure_rate);
        (self.latency + jitter, fail)
    }
}

/// Gap between events for a rate hint; 0 means as fast as 1ms ticks allow.
fn interval_for_rate(rate_hint: u32) -> Duration {
    if rate_hint == 0 {
        Duration::from_millis(1)
    } else {
        Duration::from_secs_f64(1.0 / rate_hint as f64)
    }
}

#[async_trait]
impl WorkClient for SimulatedClient {
    async fn execute_query(&self, target: &str) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        self.queries.fetch_add(1, Ordering::Relaxed);

        let (delay, fail) = self.draw();
        trace!("Simulated query for {} ({:?})", target, delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if fail {
            Err(ClientError::Status(503))
        } else {
            Ok(())
        }
    }

    async fn open_stream(&self, rate_hint: u32, cancel: CancellationToken) -> EventStream {
        if self.is_closed() {
            return EventStream::failed(ClientError::Closed);
        }

        let interval = self
            .event_interval
            .unwrap_or_else(|| interval_for_rate(rate_hint));
        let limit = self.stream_events;
        let fail_after = self.fail_stream_after;
        let (tx, stream) = EventStream::channel(DEFAULT_STREAM_BUFFER);

        tokio::spawn(async move {
            let mut emitted = 0usize;
            loop {
                if fail_after.is_some_and(|n| emitted >= n) {
                    let error = ClientError::Stream("simulated stream reset".to_string());
                    let _ = tx.send(StreamItem::Error(error)).await;
                    return;
                }
                if limit.is_some_and(|n| emitted >= n) {
                    return;
                }

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }

                if tx.send(StreamItem::Event(StreamEvent::now())).await.is_err() {
                    return;
                }
                emitted += 1;
            }
        });

        stream
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
