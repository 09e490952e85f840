//! Transport Layer
//!
//! Concrete delivery channels behind one contract:
//! - [`HttpTransport`]: point-to-point streaming request (newline-delimited
//!   JSON over one response body)
//! - [`MqttTransport`]: broker-mediated publish/subscribe with a background
//!   listener feeding the inbox buffer
//! - [`WebSocketTransport`]: persistent full-duplex socket, one message per
//!   frame
//! - [`ChannelTransport`]: in-process channels for embedding and tests
//!
//! The exchange coordinator drives any of them through [`AgentTransport`];
//! transports never interpret message contents and never enforce the
//! exchange deadline.

pub mod channel;
pub mod codec;
pub mod http;
pub mod mqtt;
pub mod traits;
pub mod websocket;

// Re-exports for convenience
pub use channel::ChannelTransport;
pub use codec::LineDecoder;
pub use http::HttpTransport;
pub use mqtt::{MqttTransport, DEFAULT_REQUEST_TOPIC, DEFAULT_RESPONSE_TOPIC};
pub use traits::{AgentTransport, TransportState};
pub use websocket::WebSocketTransport;
