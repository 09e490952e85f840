//! Full-Duplex Socket Transport
//!
//! Persistent bidirectional WebSocket connection: one text frame per encoded
//! message in both directions. The socket itself preserves delivery order and
//! there are no unrelated producers, so `recv_next` reads frames directly
//! with no inbox indirection.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use super::traits::{AgentTransport, TransportState};
use crate::error::CourierError;
use crate::message::Message;

type WsSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Full-duplex transport over a WebSocket connection
pub struct WebSocketTransport {
    url: String,
    state: TransportState,
    socket: Option<WsSocket>,
}

impl WebSocketTransport {
    /// Create a transport targeting a `ws://` (or `wss://`) URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: TransportState::Unconnected,
            socket: None,
        }
    }

    /// The connection URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AgentTransport for WebSocketTransport {
    fn state(&self) -> TransportState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), CourierError> {
        self.state.require_unconnected()?;

        let (socket, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| CourierError::ConnectionRefused(format!("{}: {e}", self.url)))?;

        self.socket = Some(socket);
        self.state = TransportState::Connected;
        debug!(url = %self.url, "websocket transport connected");
        Ok(())
    }

    async fn send(&mut self, message: &Message) -> Result<(), CourierError> {
        self.state.require_connected()?;
        let socket = self.socket.as_mut().ok_or(CourierError::NotConnected)?;

        let encoded = message.encode()?;
        socket
            .send(WsFrame::Text(encoded))
            .await
            .map_err(|e| CourierError::TransportFailure(format!("frame send failed: {e}")))
    }

    async fn recv_next(&mut self) -> Result<Option<Message>, CourierError> {
        self.state.require_connected()?;
        let socket = self.socket.as_mut().ok_or(CourierError::NotConnected)?;

        loop {
            match socket.next().await {
                Some(Ok(WsFrame::Text(text))) => return Message::decode(&text).map(Some),
                Some(Ok(WsFrame::Binary(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes);
                    return Message::decode(&text).map(Some);
                }
                // Control frames carry no application messages
                Some(Ok(WsFrame::Ping(_) | WsFrame::Pong(_) | WsFrame::Frame(_))) => {}
                Some(Ok(WsFrame::Close(_))) | None => {
                    warn!(url = %self.url, "peer closed the websocket");
                    return Ok(None);
                }
                Some(Err(e)) => {
                    return Err(CourierError::TransportFailure(format!(
                        "frame receive failed: {e}"
                    )));
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), CourierError> {
        if self.state == TransportState::Closed {
            return Ok(());
        }
        if let Some(mut socket) = self.socket.take() {
            // Best effort; the peer may already be gone
            let _ = socket.close(None).await;
        }
        self.state = TransportState::Closed;
        debug!(url = %self.url, "websocket transport closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let mut transport = WebSocketTransport::new("ws://127.0.0.1:8765/ws");
        assert!(matches!(
            transport.send(&Message::new()).await,
            Err(CourierError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_refused() {
        let mut transport = WebSocketTransport::new("ws://127.0.0.1:9/ws");
        assert!(matches!(
            transport.connect().await,
            Err(CourierError::ConnectionRefused(_))
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut transport = WebSocketTransport::new("ws://127.0.0.1:8765/ws");
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert_eq!(transport.state(), TransportState::Closed);
    }

    #[tokio::test]
    async fn test_closed_transport_cannot_reconnect() {
        let mut transport = WebSocketTransport::new("ws://127.0.0.1:8765/ws");
        transport.close().await.unwrap();
        assert!(matches!(
            transport.connect().await,
            Err(CourierError::NotConnected)
        ));
    }
}
