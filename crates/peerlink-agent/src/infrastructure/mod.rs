//! Infrastructure layer for the agent.
//!
//! Contains the adapters behind the application ports and the ambient
//! plumbing the binary needs.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `peerlink_core`, but MUST NOT be imported by the `application` or domain
//! layers outside of tests.
//!
//! # Sub-modules
//!
//! - **`platform`** – Implementations of `RadioState`, `ScanSource`, and
//!   `TransportFactory`: in-memory simulators, a bonded-device source, and an
//!   adapter for blocking transport stacks.
//!
//! - **`observer`** – `Observer` implementations: forward to a channel, log
//!   through `tracing`, print JSON lines, or fan out to several observers.
//!
//! - **`storage`** – TOML configuration file persistence.

pub mod observer;
pub mod platform;
pub mod storage;
