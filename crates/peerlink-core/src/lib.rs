//! # peerlink-core
//!
//! Shared library for peerlink containing the domain entities used to find a
//! nearby short-range wireless peer and pick one to connect to.
//!
//! This crate has zero dependencies on radio APIs, async runtimes, or sockets.
//! Everything here is plain data plus the rules that govern it, so it can be
//! unit-tested on any machine without hardware.
//!
//! # Architecture overview
//!
//! peerlink acquires a *target*: it scans for peers, keeps a deduplicated list
//! of what it has seen, scores that list with a heuristic, and then tries an
//! ordered list of connection strategies until one of them yields a stream.
//!
//! This crate (`peerlink-core`) is the foundation.  It defines:
//!
//! - **`domain`** – The records that flow through the system: [`PeerDevice`]
//!   and the [`DeviceRegistry`] that deduplicates them, the [`ScanSession`]
//!   lifecycle, and the [`Strategy`] / [`ConnectionAttempt`] bookkeeping used
//!   by the connection engine.
//!
//! - **`selection`** – The pluggable [`TargetHeuristic`] trait, the built-in
//!   heuristics, and [`select_target`], the pure function that picks zero or
//!   one target from a device list.
//!
//! The async orchestration (scanning, connecting, writing) lives in the
//! `peerlink-agent` crate, which depends on this one.

pub mod domain;
pub mod selection;

// Re-export the most-used types at the crate root so callers can write
// `peerlink_core::PeerDevice` instead of `peerlink_core::domain::device::PeerDevice`.
pub use domain::device::{PeerAddress, PeerDevice, Sighting};
pub use domain::registry::DeviceRegistry;
pub use domain::session::{
    CompletionReason, ScanSession, ScanState, TransitionError, MAX_SCAN_DURATION,
};
pub use domain::strategy::{
    AttemptOutcome, ConnectionAttempt, NegotiationMode, Strategy, UnknownModeError,
    SERIAL_PORT_SERVICE_ID,
};
pub use selection::heuristics::{AddressAllowlist, BuiltinHeuristic, NameContains, StrongestSignal};
pub use selection::{select_target, Score, TargetHeuristic};
