//! Transport Contract
//!
//! One trait defines the capability surface the exchange coordinator needs
//! from a delivery channel. Each concrete variant (streaming HTTP,
//! publish/subscribe, full-duplex socket, in-process channel) implements the
//! same contract, so a single coordinator loop drives them all.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::message::Message;

/// Lifecycle state of a transport.
///
/// The only legal path is `Unconnected -> Connected -> Closed`. `Closed` is
/// terminal; re-opening requires a new transport instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    /// Created but never connected
    Unconnected,
    /// Connection established; send/receive are valid
    Connected,
    /// Closed; terminal
    Closed,
}

impl TransportState {
    /// Fail unless send/receive operations are currently valid
    pub fn require_connected(self) -> Result<(), CourierError> {
        match self {
            Self::Connected => Ok(()),
            Self::Unconnected | Self::Closed => Err(CourierError::NotConnected),
        }
    }

    /// Fail unless `connect()` is currently valid.
    ///
    /// Connecting twice is a caller error; connecting a closed transport is
    /// indistinguishable from using one that was never opened.
    pub fn require_unconnected(self) -> Result<(), CourierError> {
        match self {
            Self::Unconnected => Ok(()),
            Self::Connected => Err(CourierError::AlreadyConnected),
            Self::Closed => Err(CourierError::NotConnected),
        }
    }
}

/// A concrete delivery channel.
///
/// Implementations know how to open their connection, push one outbound
/// [`Message`], and surface inbound messages one at a time through
/// [`recv_next`](AgentTransport::recv_next). They do not interpret message
/// contents and they do not enforce the exchange deadline; the coordinator
/// owns both concerns.
#[async_trait]
pub trait AgentTransport: Send {
    /// Current lifecycle state
    fn state(&self) -> TransportState;

    /// Open the connection.
    ///
    /// # Errors
    ///
    /// - [`CourierError::AlreadyConnected`] when already connected
    /// - [`CourierError::NotConnected`] when already closed
    /// - [`CourierError::ConnectionRefused`] when the remote end is
    ///   unreachable
    async fn connect(&mut self) -> Result<(), CourierError>;

    /// Push one outbound message.
    ///
    /// Only valid in [`TransportState::Connected`].
    async fn send(&mut self, message: &Message) -> Result<(), CourierError>;

    /// Obtain the next inbound message.
    ///
    /// Returns `Ok(None)` when nothing is pending right now; the caller polls
    /// again. Variants whose receive path is an open byte stream may suspend
    /// on the underlying read; the coordinator bounds every call by the
    /// remaining deadline.
    async fn recv_next(&mut self) -> Result<Option<Message>, CourierError>;

    /// Close the connection.
    ///
    /// Idempotent: closing an already-closed or never-connected transport is
    /// a no-op. Releases any background listener and discards buffered
    /// inbound messages.
    async fn close(&mut self) -> Result<(), CourierError>;

    /// Whether the transport is currently connected
    fn is_connected(&self) -> bool {
        self.state() == TransportState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_connected() {
        assert!(TransportState::Connected.require_connected().is_ok());
        assert!(matches!(
            TransportState::Unconnected.require_connected(),
            Err(CourierError::NotConnected)
        ));
        assert!(matches!(
            TransportState::Closed.require_connected(),
            Err(CourierError::NotConnected)
        ));
    }

    #[test]
    fn test_require_unconnected() {
        assert!(TransportState::Unconnected.require_unconnected().is_ok());
        assert!(matches!(
            TransportState::Connected.require_unconnected(),
            Err(CourierError::AlreadyConnected)
        ));
        // Closed is terminal: a new instance is required, not a reconnect
        assert!(matches!(
            TransportState::Closed.require_unconnected(),
            Err(CourierError::NotConnected)
        ));
    }
}
