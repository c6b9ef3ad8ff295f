//! Domain entities for peerlink.
//!
//! This module contains pure business logic with no infrastructure dependencies.
//!
//! # What lives here
//!
//! - **`device`** – [`device::PeerAddress`], [`device::Sighting`] and
//!   [`device::PeerDevice`]: who was seen, when, and how strongly.
//! - **`registry`** – [`registry::DeviceRegistry`], the deduplicated,
//!   insertion-ordered set of peers seen during the current scan session.
//! - **`session`** – [`session::ScanSession`], the state machine for one
//!   bounded discovery attempt.
//! - **`strategy`** – [`strategy::Strategy`] (a negotiation mode plus service
//!   id) and the [`strategy::ConnectionAttempt`] records the connection engine
//!   accumulates while it works through a strategy list.
//!
//! Code in outer layers (application, infrastructure) depends on the domain,
//! but the domain never depends on them.

pub mod device;
pub mod registry;
pub mod session;
pub mod strategy;
