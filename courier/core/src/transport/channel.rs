//! In-Process Transport
//!
//! Channel-backed transport for embedded use and deterministic tests. The
//! peer half is a plain pair of tokio channels, so a test can play the remote
//! end: read what the transport sends and feed it inbound messages.
//!
//! # Usage
//!
//! ```
//! use courier_core::transport::{AgentTransport, ChannelTransport};
//! use courier_core::Message;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (mut transport, mut outbound_rx, inbound_tx) = ChannelTransport::new_pair();
//! transport.connect().await.unwrap();
//!
//! transport.send(&Message::new().with("q", "hi")).await.unwrap();
//! assert!(outbound_rx.recv().await.is_some());
//!
//! inbound_tx.send(Message::new().with("answer", 42)).await.unwrap();
//! assert!(transport.recv_next().await.unwrap().is_some());
//! # }
//! ```

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{AgentTransport, TransportState};
use crate::error::CourierError;
use crate::message::Message;

const DEFAULT_CAPACITY: usize = 100;

/// In-process transport using tokio channels
pub struct ChannelTransport {
    /// Outbound messages, readable by the peer
    outbound_tx: mpsc::Sender<Message>,
    /// Inbound messages, written by the peer
    inbound_rx: mpsc::Receiver<Message>,
    state: TransportState,
}

impl ChannelTransport {
    /// Create a transport plus its peer-side channel halves.
    ///
    /// Returns:
    /// - `ChannelTransport`: drive this through the exchange coordinator
    /// - `mpsc::Receiver<Message>`: the peer reads outbound messages here
    /// - `mpsc::Sender<Message>`: the peer injects inbound messages here
    #[must_use]
    pub fn new_pair() -> (Self, mpsc::Receiver<Message>, mpsc::Sender<Message>) {
        Self::new_pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a pair with custom channel capacity
    #[must_use]
    pub fn new_pair_with_capacity(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Message>, mpsc::Sender<Message>) {
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);

        let transport = Self {
            outbound_tx,
            inbound_rx,
            state: TransportState::Unconnected,
        };

        (transport, outbound_rx, inbound_tx)
    }
}

#[async_trait]
impl AgentTransport for ChannelTransport {
    fn state(&self) -> TransportState {
        self.state
    }

    async fn connect(&mut self) -> Result<(), CourierError> {
        self.state.require_unconnected()?;
        self.state = TransportState::Connected;
        Ok(())
    }

    async fn send(&mut self, message: &Message) -> Result<(), CourierError> {
        self.state.require_connected()?;
        self.outbound_tx
            .send(message.clone())
            .await
            .map_err(|_| CourierError::TransportFailure("peer channel closed".to_string()))
    }

    async fn recv_next(&mut self) -> Result<Option<Message>, CourierError> {
        self.state.require_connected()?;
        match self.inbound_rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(CourierError::TransportFailure(
                "peer channel closed".to_string(),
            )),
        }
    }

    async fn close(&mut self) -> Result<(), CourierError> {
        if self.state == TransportState::Closed {
            return Ok(());
        }
        // Drain anything still buffered so nothing is held after close
        while self.inbound_rx.try_recv().is_ok() {}
        self.state = TransportState::Closed;
        Ok(())
    }
}
