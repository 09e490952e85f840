//! Message Payload
//!
//! The transport-independent unit of exchange: a JSON object mapping string
//! keys to arbitrary values. The core imposes no schema; callers and their
//! termination predicates interpret the fields.
//!
//! # Wire Format
//!
//! Every Message is serialized to UTF-8 JSON at the transport boundary:
//! one encoded Message per line (streaming HTTP), per published payload
//! (publish/subscribe), or per frame (full-duplex socket).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CourierError;

/// An opaque structured payload exchanged with the remote end.
///
/// Wraps a JSON object. Construction is builder-style:
///
/// ```
/// use courier_core::Message;
///
/// let msg = Message::new()
///     .with("prompt", "hello")
///     .with("stream", true);
/// assert_eq!(msg.get("prompt").and_then(|v| v.as_str()), Some("hello"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(serde_json::Map<String, Value>);

impl Message {
    /// Create an empty message
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a field, replacing any previous value under the same key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Read a boolean field, treating absence or a non-boolean value as false.
    ///
    /// This is the common shape of stream-termination flags such as
    /// `{"done": true}`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether the message has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Serialize to the wire encoding (a single JSON object, no trailing newline)
    pub fn encode(&self) -> Result<String, CourierError> {
        serde_json::to_string(&self.0)
            .map_err(|e| CourierError::TransportFailure(format!("encode failed: {e}")))
    }

    /// Deserialize from the wire encoding.
    ///
    /// # Errors
    ///
    /// Returns [`CourierError::TransportFailure`] if the input is not a JSON
    /// object.
    pub fn decode(input: &str) -> Result<Self, CourierError> {
        serde_json::from_str(input)
            .map_err(|e| CourierError::TransportFailure(format!("decode failed: {e}")))
    }

    /// Consume the message, yielding the underlying JSON object
    #[must_use]
    pub fn into_inner(self) -> serde_json::Map<String, Value> {
        self.0
    }
}

impl From<serde_json::Map<String, Value>> for Message {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }
}
