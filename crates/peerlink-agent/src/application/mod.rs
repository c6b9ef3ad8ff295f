//! Application layer use cases for the agent.
//!
//! Use cases here orchestrate the domain types from `peerlink-core` and talk
//! to the outside world only through the traits in [`ports`].  They contain
//! no radio calls and no file system access, so every one of them runs
//! against the mocks in `infrastructure::platform::mock`.
//!
//! # Sub-modules
//!
//! - **`ports`** – Boundary traits (`RadioState`, `ScanSource`,
//!   `TransportFactory`, `Observer`) and the scan event sink.
//!
//! - **`events`** – The `CoreEvent` enum pushed to observers.
//!
//! - **`discover_devices`** – Runs time-bounded scan sessions and maintains
//!   the device registry.
//!
//! - **`connect_target`** – Tries connection strategies in order until one
//!   yields a stream.
//!
//! - **`write_stream`** – Writes a payload over an open connection.
//!
//! - **`acquire_target`** – The end-to-end flow: scan, select, connect, write.

pub mod acquire_target;
pub mod connect_target;
pub mod discover_devices;
pub mod events;
pub mod ports;
pub mod write_stream;
