//! AcquireTargetUseCase: scan, pick a peer, connect, and optionally write.
//!
//! This is the end-to-end flow the headless agent runs:
//!
//! ```text
//! start_session ─► wait_for_completion ─► select_target ─► connect ─► write?
//! ```
//!
//! Selection runs on the registry snapshot taken after the session ends, so
//! the chosen peer is always one seen by that session.

use std::sync::Arc;
use std::time::Duration;

use peerlink_core::{select_target, PeerDevice, ScanState, Strategy, TargetHeuristic};
use thiserror::Error;
use tracing::info;

use super::connect_target::{ConnectError, Connection, ConnectionEngine};
use super::discover_devices::{DiscoveryController, DiscoveryError};
use super::events::CoreEvent;
use super::ports::Observer;
use super::write_stream::{StreamWriter, WriteError};

/// Why an acquisition run did not produce a connection.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("scan failed: {0}")]
    ScanFailed(String),
    #[error("no acceptable target among {devices_seen} discovered device(s)")]
    NoTarget { devices_seen: usize },
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Parameters for one run.
pub struct AcquireRequest {
    pub scan_duration: Duration,
    pub heuristic: Box<dyn TargetHeuristic + Send + Sync>,
    pub strategies: Vec<Strategy>,
    /// Written right after connecting, when present.
    pub initial_payload: Option<Vec<u8>>,
}

/// Result of a successful run.
#[derive(Debug)]
pub struct Acquisition {
    pub connection: Connection,
    /// Everything the session discovered, in first-seen order.
    pub devices: Vec<PeerDevice>,
}

pub struct AcquireTargetUseCase {
    discovery: DiscoveryController,
    engine: Arc<ConnectionEngine>,
    writer: StreamWriter,
    observer: Arc<dyn Observer>,
}

impl AcquireTargetUseCase {
    pub fn new(
        discovery: DiscoveryController,
        engine: Arc<ConnectionEngine>,
        writer: StreamWriter,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            discovery,
            engine,
            writer,
            observer,
        }
    }

    pub fn discovery(&self) -> &DiscoveryController {
        &self.discovery
    }

    /// Runs one acquisition.
    ///
    /// # Errors
    ///
    /// Returns the first stage that failed; see [`AcquireError`].
    pub async fn run(&self, request: AcquireRequest) -> Result<Acquisition, AcquireError> {
        self.discovery.start_session(request.scan_duration).await?;
        let session = self.discovery.wait_for_completion().await;
        if let Some(session) = session.filter(|s| s.state() == ScanState::Failed) {
            let reason = session.error_reason().unwrap_or("unknown error").to_string();
            return Err(AcquireError::ScanFailed(reason));
        }

        let devices = self.discovery.devices();
        let target = select_target(&devices, request.heuristic.as_ref()).cloned();
        self.observer.notify(CoreEvent::TargetSelected {
            target: target.clone(),
        });
        let Some(target) = target else {
            info!("no acceptable target among {} device(s)", devices.len());
            return Err(AcquireError::NoTarget {
                devices_seen: devices.len(),
            });
        };
        info!("selected {target}");

        let mut connection = self.engine.connect(&target, &request.strategies).await?;
        if let Some(payload) = request.initial_payload.as_deref() {
            self.writer.write(&mut connection, payload).await?;
        }

        Ok(Acquisition {
            connection,
            devices,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
