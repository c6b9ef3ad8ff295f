//! ConnectionEngine: opens a stream to a chosen peer by trying strategies in
//! order.
//!
//! # Fallback
//!
//! Strategies are tried strictly one after another.  The first one whose
//! transport call succeeds wins and no later strategy is invoked.  Each
//! failure is recorded as a [`ConnectionAttempt`] and reported, so when every
//! strategy fails the caller gets the full history in
//! [`ConnectError::ConnectionExhausted`].
//!
//! # Why more than one strategy? (for beginners)
//!
//! Peers disagree about how a link must be negotiated.  Some accept an
//! unauthenticated channel straight away; others refuse it and insist on an
//! authenticated (paired) one, which is slower and may prompt the user.  The
//! engine cannot know in advance which kind of peer it is talking to, so it:
//!
//! 1. tries the cheapest strategy first (the default sequence starts with
//!    unauthenticated);
//! 2. on failure, records why and moves on to the next strategy;
//! 3. stops at the first success, so a peer that accepts the cheap link is
//!    never asked to pair.
//!
//! Attempts never overlap.  Each one finishes (or fails) before the next
//! starts, and the caller only regains control once the whole sequence has
//! resolved.
//!
//! The engine never blocks the caller's task on a radio: the transport is
//! async, and blocking platform stacks are adapted with
//! [`BlockingTransportAdapter`](crate::infrastructure::platform::blocking::BlockingTransportAdapter).

use std::fmt;
use std::sync::Arc;

use peerlink_core::{ConnectionAttempt, PeerAddress, PeerDevice, Strategy};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::CoreEvent;
use super::ports::{BoxedStream, Observer, RadioState, TransportFactory};

/// Error type for connection attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// The radio is off or unsupported; no strategy was tried.
    #[error("cannot connect to {target}: radio is disabled or unsupported")]
    RadioUnavailable { target: PeerAddress },
    /// Every strategy failed (or none was given).
    #[error("all {} connection strategies failed for {target}", .attempts.len())]
    ConnectionExhausted {
        target: PeerAddress,
        attempts: Vec<ConnectionAttempt>,
    },
}

/// An open stream to a peer, plus the strategy that produced it.
pub struct Connection {
    peer: PeerDevice,
    strategy: Strategy,
    stream: BoxedStream,
}

impl Connection {
    pub fn new(peer: PeerDevice, strategy: Strategy, stream: BoxedStream) -> Self {
        Self {
            peer,
            strategy,
            stream,
        }
    }

    pub fn peer(&self) -> &PeerDevice {
        &self.peer
    }

    pub fn address(&self) -> &PeerAddress {
        self.peer.address()
    }

    /// The strategy that succeeded.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn stream_mut(&mut self) -> &mut BoxedStream {
        &mut self.stream
    }

    pub fn into_stream(self) -> BoxedStream {
        self.stream
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", self.peer.address())
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

/// Tries an ordered list of strategies against a target.
pub struct ConnectionEngine {
    radio: Arc<dyn RadioState>,
    transport: Arc<dyn TransportFactory>,
    observer: Arc<dyn Observer>,
}

impl ConnectionEngine {
    pub fn new(
        radio: Arc<dyn RadioState>,
        transport: Arc<dyn TransportFactory>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            radio,
            transport,
            observer,
        }
    }

    /// Connects to `target`, trying `strategies` in order.
    ///
    /// # Errors
    ///
    /// - [`ConnectError::RadioUnavailable`] if the radio is off; nothing is
    ///   attempted.
    /// - [`ConnectError::ConnectionExhausted`] if every strategy fails.  An
    ///   empty strategy list also ends here, with no attempts.
    pub async fn connect(
        &self,
        target: &PeerDevice,
        strategies: &[Strategy],
    ) -> Result<Connection, ConnectError> {
        let address = target.address().clone();

        if !self.radio.is_radio_enabled() {
            warn!("skipping connection to {target}: radio disabled");
            self.observer.notify(CoreEvent::ConnectionSkipped {
                target: address.clone(),
                reason: "radio disabled or unsupported".to_string(),
            });
            return Err(ConnectError::RadioUnavailable { target: address });
        }

        let mut attempts = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            debug!("connecting to {target} with {strategy}");
            match self.transport.open_stream(&address, strategy).await {
                Ok(stream) => {
                    info!("connected to {target} with {strategy}");
                    self.observer.notify(CoreEvent::Connected {
                        target: address,
                        strategy: *strategy,
                    });
                    return Ok(Connection::new(target.clone(), *strategy, stream));
                }
                Err(e) => {
                    warn!("{strategy} to {target} failed: {e}");
                    let attempt = ConnectionAttempt::failed(*strategy, e.to_string());
                    self.observer.notify(CoreEvent::ConnectionAttemptFailed {
                        target: address.clone(),
                        attempt: attempt.clone(),
                    });
                    attempts.push(attempt);
                }
            }
        }

        warn!(
            "giving up on {target} after {} failed attempt(s)",
            attempts.len()
        );
        self.observer.notify(CoreEvent::ConnectionExhausted {
            target: address.clone(),
            attempts: attempts.clone(),
        });
        Err(ConnectError::ConnectionExhausted {
            target: address,
            attempts,
        })
    }

    /// Runs [`connect`](Self::connect) on a background task.
    pub fn spawn_connect(
        self: Arc<Self>,
        target: PeerDevice,
        strategies: Vec<Strategy>,
    ) -> JoinHandle<Result<Connection, ConnectError>> {
        tokio::spawn(async move { self.connect(&target, &strategies).await })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockRadioState;
    use crate::infrastructure::platform::mock::{MockRadio, MockTransport, RecordingObserver};
    use peerlink_core::{NegotiationMode, Sighting};
    use std::time::SystemTime;

    fn peer(addr: &str) -> PeerDevice {
        PeerDevice::from_sighting(
            Sighting::new(addr).with_name("DESKTOP-1"),
            SystemTime::UNIX_EPOCH,
        )
    }

    fn engine(
        transport: Arc<MockTransport>,
        observer: Arc<RecordingObserver>,
    ) -> ConnectionEngine {
        ConnectionEngine::new(Arc::new(MockRadio::enabled()), transport, observer)
    }

    #[tokio::test]
    async fn test_connect_first_strategy_success_skips_the_rest() {
        // Arrange
        let transport = Arc::new(MockTransport::new());
        let observer = Arc::new(RecordingObserver::new());
        let engine = engine(transport.clone(), observer.clone());

        // Act
        let connection = engine
            .connect(&peer("AA"), &Strategy::default_sequence())
            .await
            .unwrap();

        // Assert
        assert_eq!(connection.strategy().mode, NegotiationMode::Unauthenticated);
        assert_eq!(transport.call_count(), 1);
        assert!(matches!(
            observer.events().last(),
            Some(CoreEvent::Connected { .. })
        ));
    }

    #[tokio::test]
    async fn test_connect_falls_back_to_authenticated_mode() {
        // Arrange
        let transport = Arc::new(
            MockTransport::new().refuse(NegotiationMode::Unauthenticated, "pairing required"),
        );
        let observer = Arc::new(RecordingObserver::new());
        let engine = engine(transport.clone(), observer.clone());

        // Act
        let connection = engine
            .connect(&peer("AA"), &Strategy::default_sequence())
            .await
            .unwrap();

        // Assert
        assert_eq!(connection.strategy().mode, NegotiationMode::Authenticated);
        assert_eq!(transport.call_count(), 2);
        let failures: Vec<_> = observer
            .events()
            .into_iter()
            .filter(|e| matches!(e, CoreEvent::ConnectionAttemptFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_connect_exhausted_records_every_attempt_in_order() {
        // Arrange
        let transport = Arc::new(
            MockTransport::new()
                .refuse(NegotiationMode::Unauthenticated, "refused")
                .refuse(NegotiationMode::Authenticated, "timed out"),
        );
        let engine = engine(transport, Arc::new(RecordingObserver::new()));

        // Act
        let err = engine
            .connect(&peer("AA"), &Strategy::default_sequence())
            .await
            .unwrap_err();

        // Assert
        match err {
            ConnectError::ConnectionExhausted { target, attempts } => {
                assert_eq!(target.as_str(), "AA");
                assert_eq!(attempts.len(), 2);
                assert_eq!(attempts[0].strategy.mode, NegotiationMode::Unauthenticated);
                assert_eq!(attempts[0].failure_reason(), Some("refused"));
                assert_eq!(attempts[1].failure_reason(), Some("timed out"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_with_no_strategies_is_exhausted_immediately() {
        let transport = Arc::new(MockTransport::new());
        let engine = engine(transport.clone(), Arc::new(RecordingObserver::new()));

        let err = engine.connect(&peer("AA"), &[]).await.unwrap_err();

        assert_eq!(
            err,
            ConnectError::ConnectionExhausted {
                target: PeerAddress::new("AA"),
                attempts: Vec::new(),
            }
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_with_radio_off_attempts_nothing() {
        // Arrange
        let mut radio = MockRadioState::new();
        radio.expect_is_radio_enabled().times(1).return_const(false);
        let transport = Arc::new(MockTransport::new());
        let observer = Arc::new(RecordingObserver::new());
        let engine = ConnectionEngine::new(Arc::new(radio), transport.clone(), observer.clone());

        // Act
        let err = engine
            .connect(&peer("AA"), &Strategy::default_sequence())
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, ConnectError::RadioUnavailable { .. }));
        assert_eq!(transport.call_count(), 0);
        assert!(matches!(
            observer.events().as_slice(),
            [CoreEvent::ConnectionSkipped { .. }]
        ));
    }

    #[tokio::test]
    async fn test_spawn_connect_returns_connection_from_background_task() {
        let engine = Arc::new(engine(
            Arc::new(MockTransport::new()),
            Arc::new(RecordingObserver::new()),
        ));

        let connection = engine
            .spawn_connect(peer("AA"), Strategy::default_sequence())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(connection.address().as_str(), "AA");
    }
}
