//! DeviceRegistry: the deduplicated set of peers seen in the current session.
//!
//! # Ordering
//!
//! Peers are kept in first-seen order.  A re-sighting updates the existing
//! record in place and never moves it, so a list rendered from
//! [`DeviceRegistry::list_all`] stays stable while a scan is running.
//!
//! # Storage choice
//!
//! A `Vec<PeerDevice>` holds the records in insertion order and a
//! `HashMap<PeerAddress, usize>` maps each address to its slot, giving O(1)
//! upserts without giving up deterministic iteration.
//!
//! The registry is not thread-aware.  The discovery controller is its only
//! writer and serialises access to it.

use std::collections::HashMap;
use std::time::SystemTime;

use tracing::trace;

use super::device::{PeerAddress, PeerDevice, Sighting};

/// Deduplicated, insertion-ordered collection of discovered peers.
#[derive(Debug, Default, Clone)]
pub struct DeviceRegistry {
    devices: Vec<PeerDevice>,
    index: HashMap<PeerAddress, usize>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates the record for the sighted address, stamping it
    /// with the current wall-clock time.
    pub fn record_sighting(&mut self, sighting: Sighting) -> &PeerDevice {
        self.record_sighting_at(sighting, SystemTime::now())
    }

    /// Inserts or updates the record for the sighted address, stamping it
    /// with `at`.
    ///
    /// Never creates a second record for an address that is already known.
    pub fn record_sighting_at(&mut self, sighting: Sighting, at: SystemTime) -> &PeerDevice {
        match self.index.get(&sighting.address).copied() {
            Some(slot) => {
                trace!("re-sighted {}", sighting.address);
                let device = &mut self.devices[slot];
                device.refresh(sighting, at);
                device
            }
            None => {
                trace!("new peer {}", sighting.address);
                let slot = self.devices.len();
                self.index.insert(sighting.address.clone(), slot);
                self.devices.push(PeerDevice::from_sighting(sighting, at));
                &self.devices[slot]
            }
        }
    }

    /// Returns every known peer in first-seen order.
    pub fn list_all(&self) -> &[PeerDevice] {
        &self.devices
    }

    /// Looks up a peer by address.
    pub fn get(&self, address: &PeerAddress) -> Option<&PeerDevice> {
        self.index.get(address).map(|&slot| &self.devices[slot])
    }

    pub fn contains(&self, address: &PeerAddress) -> bool {
        self.index.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Removes every record.  Called when a new scan session begins.
    pub fn clear(&mut self) {
        self.devices.clear();
        self.index.clear();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
