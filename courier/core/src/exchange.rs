//! Exchange Coordinator
//!
//! Drives one logical request through a transport: pushes the outbound
//! message, then repeatedly obtains inbound messages, classifying each as
//! "more to come" or "final" via a caller-supplied termination predicate,
//! until the predicate fires or the deadline elapses. One coordinator loop
//! serves every transport variant; the per-variant receive differences are
//! normalized behind [`AgentTransport::recv_next`].
//!
//! # Modes
//!
//! - Without a predicate: exactly one inbound message is the result.
//! - With a predicate: the result is the ordered sequence of messages up to
//!   and including the first one the predicate accepts.
//!
//! # Deadline
//!
//! The deadline is fixed when the exchange starts: start time plus the
//! configured timeout. Every suspension point is bounded by the remaining
//! deadline, so no exchange can wait past its budget. A timeout discards any
//! partially accumulated sequence; callers cannot tell a truncated stream
//! from a complete one, so partial data is never returned.
//!
//! # Tie-Break
//!
//! The predicate is evaluated on each message before any elapsed-time check.
//! A genuinely final message arriving exactly at the deadline is a success.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, trace};

use crate::error::CourierError;
use crate::message::Message;
use crate::transport::AgentTransport;

/// Decides whether an inbound message ends the current exchange's stream.
///
/// This boxed form is for callers that store predicates; the coordinator's
/// entry points also accept any `Fn(&Message) -> bool` directly.
pub type TerminationPredicate = Box<dyn Fn(&Message) -> bool + Send + Sync>;

/// Correlates the log lines of one exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeId(pub String);

impl ExchangeId {
    /// Generate a new random exchange id
    #[must_use]
    pub fn new() -> Self {
        let bytes: [u8; 8] = rand::thread_rng().gen();
        Self(format!("xchg_{}", hex::encode(bytes)))
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of one exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangePhase {
    /// No exchange started yet (or the coordinator is ready for the next one)
    Idle,
    /// The outbound message has been pushed
    Sent,
    /// Inbound messages are being collected
    Collecting,
    /// Terminal: the exchange produced its result
    Completed,
    /// Terminal: the deadline elapsed first
    TimedOut,
    /// Terminal: the transport failed mid-exchange
    Failed,
}

impl ExchangePhase {
    /// Whether this phase ends an exchange
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }
}

/// Timing knobs for an exchange
#[derive(Clone, Copy, Debug)]
pub struct ExchangeOptions {
    /// Total budget for one exchange, send to final message
    pub timeout: Duration,
    /// Sleep between empty polls of the receive surface
    pub poll_interval: Duration,
}

impl Default for ExchangeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl ExchangeOptions {
    /// Override the total exchange timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the empty-poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Runs exchanges over any [`AgentTransport`].
///
/// At most one exchange may be in flight per coordinator (and per transport);
/// the `&mut` receivers make overlap unrepresentable, and a phase guard
/// rejects reuse after an exchange that was abandoned mid-flight.
#[derive(Debug)]
pub struct ExchangeCoordinator {
    options: ExchangeOptions,
    phase: ExchangePhase,
}

impl Default for ExchangeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeCoordinator {
    /// Create a coordinator with default options
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ExchangeOptions::default())
    }

    /// Create a coordinator with explicit options
    #[must_use]
    pub fn with_options(options: ExchangeOptions) -> Self {
        Self {
            options,
            phase: ExchangePhase::Idle,
        }
    }

    /// Phase of the most recent exchange
    #[must_use]
    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    /// The configured timing knobs
    #[must_use]
    pub fn options(&self) -> &ExchangeOptions {
        &self.options
    }

    /// Run a single-response exchange: send one message, return the one
    /// inbound message that answers it.
    ///
    /// # Errors
    ///
    /// [`CourierError::NotConnected`] if the transport is not connected,
    /// [`CourierError::Timeout`] if the deadline elapses first, or the
    /// transport's own failure kind.
    pub async fn execute_single<T: AgentTransport>(
        &mut self,
        transport: &mut T,
        outbound: Message,
    ) -> Result<Message, CourierError> {
        let mut sequence = self.run(transport, outbound, None).await?;
        sequence
            .pop()
            .ok_or_else(|| CourierError::TransportFailure("empty exchange result".to_string()))
    }

    /// Run a streaming exchange: send one message, collect inbound messages
    /// until `ended` accepts one.
    ///
    /// The returned sequence is ordered as delivered; its last element is the
    /// message the predicate accepted.
    pub async fn execute_stream<T, P>(
        &mut self,
        transport: &mut T,
        outbound: Message,
        ended: P,
    ) -> Result<Vec<Message>, CourierError>
    where
        T: AgentTransport,
        P: Fn(&Message) -> bool,
    {
        self.run(transport, outbound, Some(&ended)).await
    }

    async fn run<T: AgentTransport>(
        &mut self,
        transport: &mut T,
        outbound: Message,
        predicate: Option<&dyn Fn(&Message) -> bool>,
    ) -> Result<Vec<Message>, CourierError> {
        // An exchange abandoned mid-flight (cancelled future) leaves stale
        // state on the connection; require an explicit close instead of
        // silently mixing two exchanges' messages
        if !self.phase.is_terminal() && self.phase != ExchangePhase::Idle {
            return Err(CourierError::TransportFailure(
                "previous exchange never reached a terminal phase".to_string(),
            ));
        }

        if let Err(e) = transport.state().require_connected() {
            self.phase = ExchangePhase::Failed;
            return Err(e);
        }

        let id = ExchangeId::new();
        if let Err(e) = transport.send(&outbound).await {
            self.phase = ExchangePhase::Failed;
            return Err(e);
        }
        self.phase = ExchangePhase::Sent;
        debug!(exchange = %id, streaming = predicate.is_some(), "outbound message sent");

        let deadline = Instant::now() + self.options.timeout;
        let mut collected = Vec::new();
        self.phase = ExchangePhase::Collecting;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.phase = ExchangePhase::TimedOut;
                debug!(exchange = %id, "deadline elapsed");
                return Err(CourierError::Timeout(self.options.timeout));
            }

            let next = match tokio::time::timeout(remaining, transport.recv_next()).await {
                Err(_) => {
                    self.phase = ExchangePhase::TimedOut;
                    debug!(exchange = %id, "deadline elapsed while awaiting the channel");
                    return Err(CourierError::Timeout(self.options.timeout));
                }
                Ok(Err(e)) => {
                    self.phase = ExchangePhase::Failed;
                    return Err(e);
                }
                Ok(Ok(next)) => next,
            };

            match next {
                Some(message) => match predicate {
                    None => {
                        self.phase = ExchangePhase::Completed;
                        debug!(exchange = %id, "single response received");
                        return Ok(vec![message]);
                    }
                    Some(ended) => {
                        // Evaluated before any elapsed-time check: a final
                        // message at the deadline is still a success
                        let done = ended(&message);
                        collected.push(message);
                        trace!(exchange = %id, collected = collected.len(), done, "message collected");
                        if done {
                            self.phase = ExchangePhase::Completed;
                            debug!(exchange = %id, total = collected.len(), "stream completed");
                            return Ok(collected);
                        }
                    }
                },
                None => {
                    if Instant::now() >= deadline {
                        self.phase = ExchangePhase::TimedOut;
                        debug!(exchange = %id, "deadline elapsed");
                        return Err(CourierError::Timeout(self.options.timeout));
                    }
                    tokio::time::sleep(self.options.poll_interval).await;
                }
            }
        }
    }
}
