//! Agent Link
//!
//! Lifecycle manager for one transport: owns the connection's open/close and
//! an [`ExchangeCoordinator`], and guarantees the coordinator never touches a
//! closed or unopened transport. The link is the surface most callers use;
//! the coordinator and transports remain available for direct composition.
//!
//! `connect()` is strict: connecting an already-connected link is a caller
//! error. `close()` is idempotent: closing a closed or never-connected link
//! is a no-op.

use tracing::debug;

use crate::error::CourierError;
use crate::exchange::{ExchangeCoordinator, ExchangeOptions, ExchangePhase};
use crate::message::Message;
use crate::transport::{AgentTransport, TransportState};

/// One transport plus the coordinator that drives exchanges over it
pub struct AgentLink<T: AgentTransport> {
    transport: T,
    coordinator: ExchangeCoordinator,
}

impl<T: AgentTransport> AgentLink<T> {
    /// Wrap a transport with default exchange options
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, ExchangeOptions::default())
    }

    /// Wrap a transport with explicit exchange options
    #[must_use]
    pub fn with_options(transport: T, options: ExchangeOptions) -> Self {
        Self {
            transport,
            coordinator: ExchangeCoordinator::with_options(options),
        }
    }

    /// Open the underlying connection.
    ///
    /// # Errors
    ///
    /// [`CourierError::AlreadyConnected`] when already connected,
    /// [`CourierError::NotConnected`] when the link was closed,
    /// [`CourierError::ConnectionRefused`] when the remote is unreachable.
    pub async fn connect(&mut self) -> Result<(), CourierError> {
        self.transport.connect().await
    }

    /// Close the underlying connection. Idempotent; discards any buffered
    /// inbound messages and releases background listeners.
    pub async fn close(&mut self) -> Result<(), CourierError> {
        self.transport.close().await
    }

    /// Send one message and wait for its single response
    pub async fn request(&mut self, outbound: Message) -> Result<Message, CourierError> {
        self.coordinator
            .execute_single(&mut self.transport, outbound)
            .await
    }

    /// Send one message and collect the response stream until `ended`
    /// accepts a message
    pub async fn request_stream<P>(
        &mut self,
        outbound: Message,
        ended: P,
    ) -> Result<Vec<Message>, CourierError>
    where
        P: Fn(&Message) -> bool,
    {
        self.coordinator
            .execute_stream(&mut self.transport, outbound, ended)
            .await
    }

    /// Whether the link is currently connected
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Lifecycle state of the underlying transport
    #[must_use]
    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    /// Phase of the most recent exchange
    #[must_use]
    pub fn last_phase(&self) -> ExchangePhase {
        self.coordinator.phase()
    }

    /// Tear the link apart, recovering the transport
    #[must_use]
    pub fn into_transport(self) -> T {
        let transport = self.transport;
        debug!("agent link dismantled");
        transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use std::time::Duration;

    fn test_link() -> (
        AgentLink<ChannelTransport>,
        tokio::sync::mpsc::Receiver<Message>,
        tokio::sync::mpsc::Sender<Message>,
    ) {
        let (transport, outbound_rx, inbound_tx) = ChannelTransport::new_pair();
        let options = ExchangeOptions::default().with_timeout(Duration::from_millis(500));
        (AgentLink::with_options(transport, options), outbound_rx, inbound_tx)
    }

    #[tokio::test]
    async fn test_request_roundtrip() {
        let (mut link, mut outbound_rx, inbound_tx) = test_link();
        link.connect().await.unwrap();
        assert!(link.is_connected());

        inbound_tx
            .send(Message::new().with("answer", "yes"))
            .await
            .unwrap();
        let response = link.request(Message::new().with("q", "?")).await.unwrap();

        assert_eq!(response.get("answer").and_then(|v| v.as_str()), Some("yes"));
        assert_eq!(
            outbound_rx.recv().await.unwrap().get("q").and_then(|v| v.as_str()),
            Some("?")
        );
        assert_eq!(link.last_phase(), ExchangePhase::Completed);
    }

    #[tokio::test]
    async fn test_request_before_connect_fails() {
        let (mut link, _outbound_rx, _inbound_tx) = test_link();
        assert!(matches!(
            link.request(Message::new()).await,
            Err(CourierError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (mut link, _outbound_rx, _inbound_tx) = test_link();
        link.connect().await.unwrap();
        link.close().await.unwrap();
        link.close().await.unwrap();
        assert!(!link.is_connected());
        assert_eq!(link.state(), TransportState::Closed);
    }

    #[tokio::test]
    async fn test_close_never_connected_is_noop() {
        let (mut link, _outbound_rx, _inbound_tx) = test_link();
        link.close().await.unwrap();
        assert_eq!(link.state(), TransportState::Closed);
    }

    #[tokio::test]
    async fn test_request_after_close_fails() {
        let (mut link, _outbound_rx, _inbound_tx) = test_link();
        link.connect().await.unwrap();
        link.close().await.unwrap();
        assert!(matches!(
            link.request(Message::new()).await,
            Err(CourierError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_strict_reconnect() {
        let (mut link, _outbound_rx, _inbound_tx) = test_link();
        link.connect().await.unwrap();
        assert!(matches!(
            link.connect().await,
            Err(CourierError::AlreadyConnected)
        ));
    }
}
