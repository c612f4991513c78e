//! HTTP implementation of [`WorkClient`].

use crate::sse::SseLineBuffer;
use async_trait::async_trait;
use bench_runner::{
    ClientError, EventStream, StreamEvent, StreamItem, WorkClient, DEFAULT_STREAM_BUFFER,
};
use futures::StreamExt;
use reqwest::{header, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Per-request timeout for queries. Streams are not subject to it.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_IDLE_PER_HOST: usize = 100;
const IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// REST client for the balance and transaction-stream endpoints.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    closed: AtomicBool,
}

impl HttpClient {
    /// Build a pooled client for `base_url`. A trailing `/` is ignored.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn balance_url(&self, account_id: &str) -> String {
        format!("{}/api/v1/accounts/{}/balance", self.base_url, account_id)
    }

    pub fn stream_url(&self, rate: u32) -> String {
        let url = format!("{}/api/v1/transactions/stream", self.base_url);
        if rate > 0 {
            format!("{url}?rate={rate}")
        } else {
            url
        }
    }

    fn ensure_open(&self) -> Result<(), ClientError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ClientError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl WorkClient for HttpClient {
    async fn execute_query(&self, target: &str) -> Result<(), ClientError> {
        self.ensure_open()?;

        let response = self
            .client
            .get(self.balance_url(target))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        // drain so the connection returns to the pool
        response
            .bytes()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        if status != StatusCode::OK {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(())
    }

    async fn open_stream(&self, rate_hint: u32, cancel: CancellationToken) -> EventStream {
        if let Err(e) = self.ensure_open() {
            return EventStream::failed(e);
        }

        let request = self
            .client
            .get(self.stream_url(rate_hint))
            .header(header::ACCEPT, "text/event-stream");
        let (tx, stream) = EventStream::channel(DEFAULT_STREAM_BUFFER);

        tokio::spawn(async move {
            if let Err(e) = pump_events(request, &tx, &cancel).await {
                if !cancel.is_cancelled() {
                    let _ = tx.send(StreamItem::Error(e)).await;
                }
            }
        });

        stream
    }

    async fn close(&self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::Release);
        debug!("HTTP client for {} closed", self.base_url);
        Ok(())
    }
}

/// Forward one event per SSE `data:` line until the body ends, the receiver
/// goes away, or `cancel` fires.
async fn pump_events(
    request: reqwest::RequestBuilder,
    tx: &mpsc::Sender<StreamItem>,
    cancel: &CancellationToken,
) -> Result<(), ClientError> {
    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        response = request.send() => response.map_err(|e| ClientError::Transport(e.to_string()))?,
    };

    let status = response.status();
    if status != StatusCode::OK {
        return Err(ClientError::Status(status.as_u16()));
    }

    let mut body = response.bytes_stream();
    let mut lines = SseLineBuffer::new();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else {
            trace!("Event stream ended");
            return Ok(());
        };
        let chunk = chunk.map_err(|e| ClientError::Stream(e.to_string()))?;

        for _ in 0..lines.push(&chunk)? {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                sent = tx.send(StreamItem::Event(StreamEvent::now())) => {
                    if sent.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
