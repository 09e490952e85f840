//! Error Taxonomy
//!
//! Every failure the core can surface to a caller, as distinct catchable
//! kinds. Callers must be able to tell a timeout apart from a connection
//! failure apart from normal completion; upstream logic (for example a
//! conversation-history writer) must not record a response that never
//! completed.
//!
//! None of these are retried automatically. Retry policy, if any, belongs to
//! the caller, layered above this core.

use std::time::Duration;

use thiserror::Error;

use crate::provider::CatalogError;

/// Errors surfaced by transports, the exchange coordinator, and the
/// parameter-resolution collaborator.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Send or receive was attempted before `connect()` or after `close()`
    #[error("transport not connected")]
    NotConnected,

    /// `connect()` was called while already connected.
    ///
    /// Redundant connects are a caller error here, not silently tolerated.
    #[error("transport already connected")]
    AlreadyConnected,

    /// The remote end was unreachable at connect time
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The deadline elapsed with no terminal message observed.
    ///
    /// Any partially accumulated sequence is discarded; the caller cannot
    /// otherwise distinguish a normal end of stream from a truncated one.
    #[error("exchange timed out after {0:?}")]
    Timeout(Duration),

    /// Decode or protocol failure from the underlying channel
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Propagated from the parameter-resolution collaborator
    #[error("configuration error: {0}")]
    Configuration(#[from] CatalogError),
}

impl CourierError {
    /// Whether this is the timeout outcome
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
