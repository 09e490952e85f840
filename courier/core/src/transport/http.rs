//! Streaming-Request Transport
//!
//! Point-to-point streaming HTTP: one POST per exchange, answered with zero
//! or more newline-delimited JSON messages over the same response body. Send
//! and receive are coupled in one request; `recv_next` drains the held body
//! one decoded line at a time.
//!
//! # Error Mapping
//!
//! - Endpoint unreachable at request time: [`CourierError::ConnectionRefused`]
//! - No data within the configured read window: [`CourierError::Timeout`]
//! - HTTP error status or malformed line: [`CourierError::TransportFailure`]

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::debug;

use super::codec::LineDecoder;
use super::traits::{AgentTransport, TransportState};
use crate::error::CourierError;
use crate::message::Message;

/// Default per-read window before the transport declares a timeout
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default window for establishing the TCP connection
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

type BodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>>;

/// Streaming-request transport over HTTP
pub struct HttpTransport {
    url: String,
    read_timeout: Duration,
    connect_timeout: Duration,
    state: TransportState,
    client: Option<reqwest::Client>,
    body: Option<BodyStream>,
    decoder: LineDecoder,
}

impl HttpTransport {
    /// Create a transport targeting one request URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: TransportState::Unconnected,
            client: None,
            body: None,
            decoder: LineDecoder::new(),
        }
    }

    /// Override the per-read window (time allowed between body chunks)
    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Override the connect window
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// The request URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_request_error(&self, err: &reqwest::Error) -> CourierError {
        if err.is_connect() {
            CourierError::ConnectionRefused(self.url.clone())
        } else if err.is_timeout() {
            CourierError::Timeout(self.read_timeout)
        } else {
            CourierError::TransportFailure(err.to_string())
        }
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    fn state(&self) -> TransportState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), CourierError> {
        self.state.require_unconnected()?;

        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .build()
            .map_err(|e| CourierError::TransportFailure(e.to_string()))?;

        self.client = Some(client);
        self.state = TransportState::Connected;
        debug!(url = %self.url, "http transport connected");
        Ok(())
    }

    async fn send(&mut self, message: &Message) -> Result<(), CourierError> {
        self.state.require_connected()?;
        let client = self.client.as_ref().ok_or(CourierError::NotConnected)?;

        // A fresh request supersedes any leftover body from a prior exchange
        self.body = None;
        self.decoder.clear();

        let response = client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| self.map_request_error(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CourierError::TransportFailure(format!(
                "server returned {status}: {text}"
            )));
        }

        self.body = Some(Box::pin(
            response.bytes_stream().map(|r| r.map(|b| b.to_vec())),
        ));
        Ok(())
    }

    async fn recv_next(&mut self) -> Result<Option<Message>, CourierError> {
        self.state.require_connected()?;

        loop {
            if let Some(msg) = self.decoder.next_message()? {
                return Ok(Some(msg));
            }

            let Some(body) = self.body.as_mut() else {
                // No request in flight, or the body already ended
                return Ok(None);
            };

            match body.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(e)) => {
                    self.body = None;
                    let mapped = self.map_request_error(&e);
                    return Err(mapped);
                }
                None => {
                    self.body = None;
                    return Ok(None);
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), CourierError> {
        if self.state == TransportState::Closed {
            return Ok(());
        }
        self.body = None;
        self.client = None;
        self.decoder.clear();
        self.state = TransportState::Closed;
        debug!(url = %self.url, "http transport closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let mut transport = HttpTransport::new("http://127.0.0.1:8000/agent");
        let result = transport.send(&Message::new()).await;
        assert!(matches!(result, Err(CourierError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_twice_fails() {
        let mut transport = HttpTransport::new("http://127.0.0.1:8000/agent");
        transport.connect().await.unwrap();
        assert!(matches!(
            transport.connect().await,
            Err(CourierError::AlreadyConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut transport = HttpTransport::new("http://127.0.0.1:8000/agent");
        transport.connect().await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert_eq!(transport.state(), TransportState::Closed);
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_everything() {
        let mut transport = HttpTransport::new("http://127.0.0.1:8000/agent");
        transport.close().await.unwrap();
        assert!(matches!(
            transport.connect().await,
            Err(CourierError::NotConnected)
        ));
        assert!(matches!(
            transport.send(&Message::new()).await,
            Err(CourierError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_recv_with_no_request_in_flight() {
        let mut transport = HttpTransport::new("http://127.0.0.1:8000/agent");
        transport.connect().await.unwrap();
        assert!(transport.recv_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_refused() {
        // Port 9 is discard; nothing listens there in the test environment
        let mut transport = HttpTransport::new("http://127.0.0.1:9/agent")
            .with_connect_timeout(Duration::from_millis(500));
        transport.connect().await.unwrap();

        let result = transport.send(&Message::new().with("q", "hi")).await;
        match result {
            Err(CourierError::ConnectionRefused(_) | CourierError::Timeout(_)) => {}
            other => panic!("expected connection failure, got {other:?}"),
        }
    }
}
