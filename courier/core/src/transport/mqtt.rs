//! Publish/Subscribe Transport
//!
//! Broker-mediated delivery over MQTT: requests are published to a fixed
//! request topic and responses arrive asynchronously on a fixed response
//! topic. `connect()` subscribes to the response topic before any send, so no
//! response can be lost to a race between subscribe and publish.
//!
//! A background listener task is the sole producer into the [`InboxBuffer`];
//! `recv_next` is a non-blocking pop from that buffer. The transport never
//! waits unboundedly: the exchange coordinator enforces the deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::traits::{AgentTransport, TransportState};
use crate::error::CourierError;
use crate::inbox::InboxBuffer;
use crate::message::Message;

/// Default topic the transport publishes requests to
pub const DEFAULT_REQUEST_TOPIC: &str = "agent/request";

/// Default topic the transport subscribes to for responses
pub const DEFAULT_RESPONSE_TOPIC: &str = "agent/response";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Generate a broker-unique client id
fn generate_client_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    format!("courier_{}", hex::encode(bytes))
}

/// Publish/subscribe transport over an MQTT broker
pub struct MqttTransport {
    host: String,
    port: u16,
    client_id: Option<String>,
    request_topic: String,
    response_topic: String,
    connect_timeout: Duration,
    state: TransportState,
    client: Option<AsyncClient>,
    listener: Option<JoinHandle<()>>,
    inbox: InboxBuffer,
    /// First unrecoverable listener failure, surfaced on the next receive
    fault: Arc<Mutex<Option<String>>>,
}

impl MqttTransport {
    /// Create a transport for the given broker address with the default
    /// topic pair
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: None,
            request_topic: DEFAULT_REQUEST_TOPIC.to_string(),
            response_topic: DEFAULT_RESPONSE_TOPIC.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: TransportState::Unconnected,
            client: None,
            listener: None,
            inbox: InboxBuffer::new(),
            fault: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the request/response topic pair
    #[must_use]
    pub fn with_topics(
        mut self,
        request_topic: impl Into<String>,
        response_topic: impl Into<String>,
    ) -> Self {
        self.request_topic = request_topic.into();
        self.response_topic = response_topic.into();
        self
    }

    /// Use a fixed client id instead of a generated one
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Override the window allowed for the broker handshake
    #[must_use]
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Number of buffered, not-yet-consumed responses
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

#[async_trait]
impl AgentTransport for MqttTransport {
    fn state(&self) -> TransportState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), CourierError> {
        self.state.require_unconnected()?;

        let client_id = self.client_id.clone().unwrap_or_else(generate_client_id);
        let mut options = MqttOptions::new(client_id, self.host.as_str(), self.port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, mut event_loop) = AsyncClient::new(options, 64);

        // Queue the subscription before the event loop ever runs, so the
        // SUBSCRIBE goes out with the handshake and no response can slip past
        client
            .subscribe(self.response_topic.as_str(), QoS::AtLeastOnce)
            .await
            .map_err(|e| CourierError::TransportFailure(format!("subscribe failed: {e}")))?;

        let inbox = self.inbox.clone();
        let fault = self.fault.clone();
        let response_topic = self.response_topic.clone();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), String>>();
        let mut ready_tx = Some(ready_tx);

        let listener = tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        if let Some(tx) = ready_tx.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        if publish.topic != response_topic {
                            continue;
                        }
                        let decoded = std::str::from_utf8(&publish.payload)
                            .map_err(|e| e.to_string())
                            .and_then(|text| Message::decode(text).map_err(|e| e.to_string()));
                        match decoded {
                            Ok(msg) => inbox.append(msg),
                            Err(e) => {
                                warn!(topic = %publish.topic, error = %e, "undecodable payload");
                                *fault.lock() = Some(format!("undecodable payload: {e}"));
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if let Some(tx) = ready_tx.take() {
                            let _ = tx.send(Err(e.to_string()));
                        } else {
                            warn!(error = %e, "mqtt listener stopped");
                            *fault.lock() = Some(e.to_string());
                        }
                        return;
                    }
                }
            }
        });

        match tokio::time::timeout(self.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                self.client = Some(client);
                self.listener = Some(listener);
                self.state = TransportState::Connected;
                debug!(host = %self.host, port = self.port, "mqtt transport connected");
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                listener.abort();
                Err(CourierError::ConnectionRefused(format!(
                    "{}:{}: {e}",
                    self.host, self.port
                )))
            }
            Ok(Err(_)) => {
                listener.abort();
                Err(CourierError::ConnectionRefused(format!(
                    "{}:{}: listener exited before the broker acknowledged",
                    self.host, self.port
                )))
            }
            Err(_) => {
                listener.abort();
                Err(CourierError::ConnectionRefused(format!(
                    "{}:{}: no broker ack within {:?}",
                    self.host, self.port, self.connect_timeout
                )))
            }
        }
    }

    async fn send(&mut self, message: &Message) -> Result<(), CourierError> {
        self.state.require_connected()?;
        if let Some(fault) = self.fault.lock().take() {
            return Err(CourierError::TransportFailure(fault));
        }
        let client = self.client.as_ref().ok_or(CourierError::NotConnected)?;

        let payload = message.encode()?;
        client
            .publish(self.request_topic.as_str(), QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| CourierError::TransportFailure(format!("publish failed: {e}")))
    }

    async fn recv_next(&mut self) -> Result<Option<Message>, CourierError> {
        self.state.require_connected()?;

        // Deliver everything that arrived before any failure
        if let Some(msg) = self.inbox.pop_front() {
            return Ok(Some(msg));
        }
        if let Some(fault) = self.fault.lock().take() {
            return Err(CourierError::TransportFailure(fault));
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), CourierError> {
        if self.state == TransportState::Closed {
            return Ok(());
        }
        if let Some(client) = self.client.take() {
            // Best effort; the broker may already be gone
            let _ = client.disconnect().await;
        }
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        self.inbox.clear();
        *self.fault.lock() = None;
        self.state = TransportState::Closed;
        debug!(host = %self.host, port = self.port, "mqtt transport closed");
        Ok(())
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
