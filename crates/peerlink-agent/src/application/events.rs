//! Events the core pushes to its [`Observer`](super::ports::Observer).
//!
//! One enum covers every stage: scan lifecycle, discovery progress, target
//! selection, connection outcome, and write outcome.  The presentation layer
//! (out of scope here) renders these; the headless binary prints them as
//! JSON lines, which is why the enum is `Serialize`.

use peerlink_core::{
    CompletionReason, ConnectionAttempt, PeerAddress, PeerDevice, ScanSession, ScanState,
    Strategy,
};
use serde::Serialize;
use uuid::Uuid;

/// Something the core wants the outside world to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    /// A scan session changed state.  Terminal states are reported once.
    ScanStateChanged {
        session_id: Uuid,
        state: ScanState,
        devices_found: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        completion: Option<CompletionReason>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// A peer was seen for the first time in the current session.
    DeviceDiscovered { session_id: Uuid, device: PeerDevice },
    /// The selector ran; `target` is `None` when nothing matched.
    TargetSelected { target: Option<PeerDevice> },
    /// Connection was not attempted because the radio is unavailable.
    ConnectionSkipped { target: PeerAddress, reason: String },
    /// One strategy failed; the engine moves on to the next.
    ConnectionAttemptFailed {
        target: PeerAddress,
        attempt: ConnectionAttempt,
    },
    /// A strategy succeeded and the stream is open.
    Connected { target: PeerAddress, strategy: Strategy },
    /// Every strategy failed.
    ConnectionExhausted {
        target: PeerAddress,
        attempts: Vec<ConnectionAttempt>,
    },
    /// Bytes were written and flushed.
    WriteCompleted { target: PeerAddress, bytes: usize },
    /// A write failed.
    WriteFailed { target: PeerAddress, reason: String },
}

impl CoreEvent {
    /// Builds a `ScanStateChanged` event from a session snapshot.
    pub fn scan_state(session: &ScanSession, devices_found: usize) -> Self {
        CoreEvent::ScanStateChanged {
            session_id: session.id(),
            state: session.state(),
            devices_found,
            completion: session.completion(),
            error: session.error_reason().map(str::to_string),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
