//! Courier Core - Transport-Agnostic Agent Messaging
//!
//! This crate lets a caller issue a logical request over one of several
//! interchangeable transports and receive either a single response or a
//! bounded stream of incremental responses, terminated by a caller-supplied
//! predicate rather than a transport-level signal.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Caller                              │
//! │        request(msg)            request_stream(msg, ended)    │
//! └───────────────┬──────────────────────────┬───────────────────┘
//!                 │                          │
//! ┌───────────────┴──────────────────────────┴───────────────────┐
//! │                     AgentLink (lifecycle)                     │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │          ExchangeCoordinator (deadline, phases)         │  │
//! │  └───────────────────────────┬─────────────────────────────┘  │
//! │                              │ AgentTransport                 │
//! │   ┌──────────┐  ┌───────────┴──┐  ┌───────────┐  ┌─────────┐ │
//! │   │   HTTP   │  │     MQTT     │  │ WebSocket │  │ Channel │ │
//! │   │ (stream) │  │ (pub/sub +   │  │ (frames)  │  │ (tests) │ │
//! │   │          │  │ inbox buffer)│  │           │  │         │ │
//! │   └──────────┘  └──────────────┘  └───────────┘  └─────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three delivery models differ fundamentally: the streaming-HTTP
//! variant couples send and receive in one request; publish/subscribe
//! decouples them through a broker and a background listener feeding the
//! [`InboxBuffer`]; the WebSocket variant reads frames off one ordered
//! socket. One [`ExchangeCoordinator`] drives all of them behind the
//! [`transport::AgentTransport`] contract, under a single timeout budget.
//!
//! # Key Types
//!
//! - [`AgentLink`]: lifecycle manager and main entry point
//! - [`ExchangeCoordinator`]: request/response correlation and
//!   streaming termination
//! - [`Message`]: the opaque JSON-object payload
//! - [`InboxBuffer`]: thread-safe FIFO for out-of-band arrivals
//! - [`ProviderProfile`]/[`Catalog`]: vendor parameter assembly and lookup
//! - [`History`]: token-budgeted conversation transcript
//!
//! # Quick Start
//!
//! ```ignore
//! use courier_core::{AgentLink, Message};
//! use courier_core::transport::WebSocketTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), courier_core::CourierError> {
//!     let transport = WebSocketTransport::new("ws://127.0.0.1:8000/ws");
//!     let mut link = AgentLink::new(transport);
//!     link.connect().await?;
//!
//!     // Stream until the server marks the final chunk
//!     let replies = link
//!         .request_stream(Message::new().with("prompt", "hello"), |m| m.flag("done"))
//!         .await?;
//!
//!     link.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency Model
//!
//! At most one exchange is in flight per transport instance; `&mut`
//! receivers enforce this at compile time and a phase guard covers exchanges
//! abandoned mid-flight. The inbox buffer is the only structure mutated from
//! two tasks (listener append, caller pop). Every suspension point is
//! bounded by the exchange deadline.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod exchange;
pub mod history;
pub mod inbox;
pub mod link;
pub mod message;
pub mod provider;
pub mod transport;

// Re-exports for convenience
pub use error::CourierError;
pub use exchange::{
    ExchangeCoordinator, ExchangeId, ExchangeOptions, ExchangePhase, TerminationPredicate,
};
pub use history::{ChatMessage, History, HistoryEntry, Role, TokenCounter};
pub use inbox::InboxBuffer;
pub use link::AgentLink;
pub use message::Message;
pub use provider::{Catalog, CatalogError, ProviderParams, ProviderProfile, Vendor};
pub use transport::{
    AgentTransport, ChannelTransport, HttpTransport, MqttTransport, TransportState,
    WebSocketTransport,
};
