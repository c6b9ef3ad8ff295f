//! Boundary traits between the application layer and the platform.
//!
//! The application layer never talks to a radio stack directly.  Instead it
//! depends on the small set of abstractions below, which the infrastructure
//! layer implements (or which tests replace with mocks):
//!
//! - [`RadioState`] – is the radio on and usable?
//! - [`ScanSource`] – starts/stops a platform scan and pushes events into a
//!   [`ScanEventSink`].
//! - [`TransportFactory`] – opens a stream to a peer with a given strategy.
//! - [`Observer`] – receives every [`CoreEvent`](super::events::CoreEvent)
//!   the core reports.
//!
//! All handles are injected at construction time as `Arc<dyn Trait>`; nothing
//! in the core looks a radio up through global state.

use std::io;

use async_trait::async_trait;
use peerlink_core::{PeerAddress, Sighting, Strategy};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use super::events::CoreEvent;

// ── Radio ─────────────────────────────────────────────────────────────────────

/// Radio state query.
#[cfg_attr(test, mockall::automock)]
pub trait RadioState: Send + Sync {
    /// Returns `false` when the radio is switched off or not supported.
    fn is_radio_enabled(&self) -> bool;
}

// ── Scan source ───────────────────────────────────────────────────────────────

/// Error reported by the platform when it rejects a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Lifecycle signals from the scan source, carried separately from sightings
/// so they are never dropped by a full sighting queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSignal {
    /// The platform confirmed that the scan stopped.
    StopAcknowledged,
    /// The platform aborted the scan.
    Error(String),
}

/// Receiving side of a [`ScanEventSink`], drained by the discovery controller.
#[derive(Debug)]
pub struct ScanEventQueue {
    pub(crate) sightings: mpsc::Receiver<Sighting>,
    pub(crate) signals: mpsc::UnboundedReceiver<ScanSignal>,
}

/// Handle the scan source uses to deliver events.
///
/// Cheap to clone and safe to move to another thread or task.  Sightings go
/// through a bounded queue; when it is full the non-blocking
/// [`try_sighting`](Self::try_sighting) drops the event, while
/// [`sighting`](Self::sighting) waits for room.
#[derive(Debug, Clone)]
pub struct ScanEventSink {
    sightings: mpsc::Sender<Sighting>,
    signals: mpsc::UnboundedSender<ScanSignal>,
}

impl ScanEventSink {
    /// Creates a connected sink/queue pair with room for `capacity` sightings.
    pub fn channel(capacity: usize) -> (Self, ScanEventQueue) {
        let (sightings_tx, sightings_rx) = mpsc::channel(capacity.max(1));
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        (
            Self {
                sightings: sightings_tx,
                signals: signals_tx,
            },
            ScanEventQueue {
                sightings: sightings_rx,
                signals: signals_rx,
            },
        )
    }

    /// Delivers a sighting without waiting.  Returns `false` if the queue is
    /// full or the session is over.
    pub fn try_sighting(&self, sighting: Sighting) -> bool {
        match self.sightings.try_send(sighting) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                warn!("scan event queue full; dropping sighting of {}", dropped.address);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Delivers a sighting, waiting for queue space.  Returns `false` once
    /// the session is over.
    pub async fn sighting(&self, sighting: Sighting) -> bool {
        self.sightings.send(sighting).await.is_ok()
    }

    /// Delivers a sighting from a platform thread outside the async runtime.
    ///
    /// Must not be called from within an async task.
    pub fn blocking_sighting(&self, sighting: Sighting) -> bool {
        self.sightings.blocking_send(sighting).is_ok()
    }

    /// Reports that the platform confirmed the scan stopped.
    pub fn stop_acknowledged(&self) -> bool {
        self.signals.send(ScanSignal::StopAcknowledged).is_ok()
    }

    /// Reports that the platform aborted the scan.
    pub fn error(&self, reason: impl Into<String>) -> bool {
        self.signals.send(ScanSignal::Error(reason.into())).is_ok()
    }

    /// Returns `true` once the controller has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.sightings.is_closed()
    }
}

/// A platform scanner.
#[async_trait]
pub trait ScanSource: Send + Sync {
    /// Starts scanning.  Sightings and lifecycle signals are pushed into
    /// `sink` until the scan stops.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the platform rejects the start request.
    async fn start_scan(&self, sink: ScanEventSink) -> Result<(), PlatformError>;

    /// Asks the platform to stop scanning.  Any acknowledgement arrives
    /// later through the sink, or not at all.
    async fn stop_scan(&self);
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// An open, bidirectional byte stream to a peer.
pub trait StreamHandle: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> StreamHandle for T where T: AsyncRead + AsyncWrite + Send + Unpin + ?Sized {}

/// Owned, type-erased stream handle.
pub type BoxedStream = Box<dyn StreamHandle>;

/// Opens streams to peers, one call per connection attempt.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Opens a stream to `target` using `strategy`.
    ///
    /// # Errors
    ///
    /// Returns the transport's I/O error when the attempt fails.
    async fn open_stream(&self, target: &PeerAddress, strategy: &Strategy) -> io::Result<BoxedStream>;
}

// ── Observer ──────────────────────────────────────────────────────────────────

/// Push sink for everything the core reports.  The core never polls it.
///
/// `notify` is called after the core has released its internal locks, so an
/// implementation may query or stop the controller that reported the event.
/// Events raised on different threads may interleave.
pub trait Observer: Send + Sync {
    fn notify(&self, event: CoreEvent);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
