//! Inbox Buffer
//!
//! Ordered, concurrency-safe holding area for inbound messages that arrive
//! out of band and must be matched to the caller awaiting them. The
//! publish/subscribe transport's listener task is the sole producer; the
//! exchange coordinator's polling loop is the sole consumer.
//!
//! # Handoff Discipline
//!
//! There is no blocking primitive for cross-thread handoff. The consumer
//! polls `pop_front` at a short fixed interval bounded by the exchange
//! deadline. This trades minor latency for simplicity and avoids lost-wakeup
//! hazards when producer and consumer tasks start and stop independently.
//!
//! FIFO order of `append` calls is the only ordering guarantee.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::message::Message;

/// Thread-safe FIFO buffer of inbound [`Message`]s.
///
/// Cloning is cheap and shares the underlying queue, so a background
/// listener can hold one handle while the consumer holds another.
#[derive(Clone, Debug, Default)]
pub struct InboxBuffer {
    inner: Arc<Mutex<VecDeque<Message>>>,
}

impl InboxBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the back (producer side)
    pub fn append(&self, message: Message) {
        self.inner.lock().push_back(message);
    }

    /// Remove and return the oldest message, if any (consumer side,
    /// non-blocking)
    #[must_use]
    pub fn pop_front(&self) -> Option<Message> {
        self.inner.lock().pop_front()
    }

    /// Discard all buffered messages.
    ///
    /// Called on close so the buffer holds no references afterwards.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of buffered messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the buffer is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
