//! Platform adapters behind the application ports.
//!
//! - **`mock`** – In-memory radio, scanner, and transport.  Used by the test
//!   suites and by the binary's simulation mode.
//! - **`bonded`** – A `ScanSource` that reports the peers the host is already
//!   paired with, without performing a radio scan.
//! - **`blocking`** – Wraps a blocking connect call so it runs on tokio's
//!   blocking pool instead of the caller's task.

pub mod blocking;
pub mod bonded;
pub mod mock;
