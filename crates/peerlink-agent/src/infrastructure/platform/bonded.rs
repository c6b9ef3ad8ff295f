//! A [`ScanSource`] backed by the host's list of already-paired peers.
//!
//! Some stacks can enumerate bonded devices instantly, without a radio scan.
//! [`BondedDeviceSource`] turns that list into ordinary sightings, so the
//! rest of the pipeline (registry, selection, connection) does not care where
//! a peer came from.  The session still runs until its deadline or an
//! explicit stop.

use std::sync::Arc;

use async_trait::async_trait;
use peerlink_core::Sighting;
use tracing::{debug, info};

use crate::application::ports::{PlatformError, ScanEventSink, ScanSource};

/// Enumerates paired peers.
pub trait BondedDevices: Send + Sync {
    /// Returns the current bond list.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the list cannot be read, for example
    /// because the host has not granted permission.
    fn bonded_devices(&self) -> Result<Vec<Sighting>, PlatformError>;
}

/// A fixed bond list.
impl BondedDevices for Vec<Sighting> {
    fn bonded_devices(&self) -> Result<Vec<Sighting>, PlatformError> {
        Ok(self.clone())
    }
}

pub struct BondedDeviceSource {
    bonds: Arc<dyn BondedDevices>,
}

impl BondedDeviceSource {
    pub fn new(bonds: Arc<dyn BondedDevices>) -> Self {
        Self { bonds }
    }
}

#[async_trait]
impl ScanSource for BondedDeviceSource {
    async fn start_scan(&self, sink: ScanEventSink) -> Result<(), PlatformError> {
        let bonded = self.bonds.bonded_devices()?;
        info!("reporting {} bonded device(s)", bonded.len());

        // Delivered from a separate task, like a platform callback would be.
        tokio::spawn(async move {
            for sighting in bonded {
                debug!("bonded device {}", sighting.address);
                if !sink.sighting(sighting).await {
                    break;
                }
            }
        });
        Ok(())
    }

    async fn stop_scan(&self) {
        // Nothing is running on the radio, so there is nothing to cancel.
        debug!("bonded device source stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
