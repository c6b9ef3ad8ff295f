//! Peer identity and sighting records.
//!
//! A [`Sighting`] is what the platform scanner reports: an address plus
//! whatever metadata happened to be available at that moment.  The registry
//! folds sightings into [`PeerDevice`] records, one per [`PeerAddress`].

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Hardware address of a peer device.
///
/// Addresses are compared case-insensitively: the raw string is trimmed and
/// upper-cased on construction, so `aa:bb:cc:dd:ee:ff` and
/// `AA:BB:CC:DD:EE:FF` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Normalises `raw` into an address key.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the normalised (upper-case) address text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PeerAddress {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for PeerAddress {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<PeerAddress> for String {
    fn from(address: PeerAddress) -> Self {
        address.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One observation of a peer during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    /// Address of the observed peer.
    pub address: PeerAddress,
    /// Advertised name, if the platform reported one.
    pub display_name: Option<String>,
    /// Received signal strength (dBm), if the platform reported one.
    pub signal_strength: Option<i16>,
}

impl Sighting {
    /// Creates a sighting carrying only an address.
    pub fn new(address: impl Into<PeerAddress>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
            signal_strength: None,
        }
    }

    /// Attaches an advertised name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Attaches a signal strength reading.
    pub fn with_signal(mut self, rssi: i16) -> Self {
        self.signal_strength = Some(rssi);
        self
    }
}

/// A discovered remote device.
///
/// Fields are read through accessors: `first_seen_at` never changes after the
/// record is created, and only the registry refreshes the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerDevice {
    address: PeerAddress,
    display_name: Option<String>,
    first_seen_at: SystemTime,
    last_seen_at: SystemTime,
    signal_strength: Option<i16>,
}

impl PeerDevice {
    /// Builds a new record from its first sighting.
    pub fn from_sighting(sighting: Sighting, at: SystemTime) -> Self {
        Self {
            address: sighting.address,
            display_name: sighting.display_name,
            first_seen_at: at,
            last_seen_at: at,
            signal_strength: sighting.signal_strength,
        }
    }

    /// Folds a re-sighting into this record.
    ///
    /// `last_seen_at` always moves to `at`.  Name and signal strength keep
    /// their last observed value when the new sighting does not carry one.
    pub(crate) fn refresh(&mut self, sighting: Sighting, at: SystemTime) {
        self.last_seen_at = at;
        if sighting.display_name.is_some() {
            self.display_name = sighting.display_name;
        }
        if sighting.signal_strength.is_some() {
            self.signal_strength = sighting.signal_strength;
        }
    }

    pub fn address(&self) -> &PeerAddress {
        &self.address
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn first_seen_at(&self) -> SystemTime {
        self.first_seen_at
    }

    pub fn last_seen_at(&self) -> SystemTime {
        self.last_seen_at
    }

    pub fn signal_strength(&self) -> Option<i16> {
        self.signal_strength
    }
}

impl fmt::Display for PeerDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{name} ({})", self.address),
            None => write!(f, "<unnamed> ({})", self.address),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_peer_address_comparison_ignores_case() {
        // Arrange
        let lower = PeerAddress::new("aa:bb:cc:dd:ee:ff");
        let upper = PeerAddress::new("AA:BB:CC:DD:EE:FF");

        // Act / Assert
        assert_eq!(lower, upper);
        assert_eq!(lower.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_peer_address_trims_surrounding_whitespace() {
        let addr = PeerAddress::new("  01:02:03:04:05:06 \n");
        assert_eq!(addr.to_string(), "01:02:03:04:05:06");
    }

    #[test]
    fn test_peer_address_serializes_as_plain_string() {
        let addr = PeerAddress::new("0a:0b:0c:0d:0e:0f");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0A:0B:0C:0D:0E:0F\"");

        let back: PeerAddress = serde_json::from_str("\"0a:0b:0c:0d:0e:0f\"").unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_from_sighting_sets_first_and_last_seen_to_same_instant() {
        // Arrange
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let sighting = Sighting::new("11:22:33:44:55:66")
            .with_name("DESKTOP-ABC")
            .with_signal(-60);

        // Act
        let device = PeerDevice::from_sighting(sighting, at);

        // Assert
        assert_eq!(device.first_seen_at(), at);
        assert_eq!(device.last_seen_at(), at);
        assert_eq!(device.display_name(), Some("DESKTOP-ABC"));
        assert_eq!(device.signal_strength(), Some(-60));
    }

    #[test]
    fn test_refresh_keeps_first_seen_and_moves_last_seen() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let t1 = t0 + Duration::from_secs(5);
        let mut device = PeerDevice::from_sighting(Sighting::new("AA"), t0);

        device.refresh(Sighting::new("AA").with_signal(-40), t1);

        assert_eq!(device.first_seen_at(), t0);
        assert_eq!(device.last_seen_at(), t1);
        assert_eq!(device.signal_strength(), Some(-40));
    }

    #[test]
    fn test_refresh_without_metadata_keeps_last_observed_values() {
        let t0 = SystemTime::UNIX_EPOCH;
        let mut device = PeerDevice::from_sighting(
            Sighting::new("AA").with_name("laptop").with_signal(-70),
            t0,
        );

        device.refresh(Sighting::new("AA"), t0 + Duration::from_secs(1));

        assert_eq!(device.display_name(), Some("laptop"));
        assert_eq!(device.signal_strength(), Some(-70));
    }

    #[test]
    fn test_display_falls_back_to_unnamed() {
        let device = PeerDevice::from_sighting(Sighting::new("aa"), SystemTime::UNIX_EPOCH);
        assert_eq!(device.to_string(), "<unnamed> (AA)");
    }
}
