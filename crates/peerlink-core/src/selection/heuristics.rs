//! Built-in target heuristics.
//!
//! - [`NameContains`] – case-insensitive substring match on the display name.
//!   Every match scores the same, so [`select_target`](super::select_target)
//!   falls back to the most recent sighting.  This is the default.
//! - [`StrongestSignal`] – score is the signal strength; devices below an
//!   optional floor, or without a reading, are rejected.
//! - [`AddressAllowlist`] – only listed addresses are accepted; earlier
//!   entries outrank later ones.
//!
//! [`BuiltinHeuristic`] wraps all three behind one serde-tagged enum so the
//! choice can live in a configuration file.

use serde::{Deserialize, Serialize};

use super::{Score, TargetHeuristic};
use crate::domain::device::{PeerAddress, PeerDevice};

/// Marker used by the default name heuristic.
pub const DEFAULT_NAME_MARKER: &str = "DESKTOP";

/// Accepts devices whose display name contains `marker`, ignoring case.
///
/// Devices without a display name never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameContains {
    marker: String,
}

impl NameContains {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for NameContains {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_MARKER)
    }
}

impl TargetHeuristic for NameContains {
    fn score(&self, device: &PeerDevice) -> Option<Score> {
        let name = device.display_name()?;
        name.to_lowercase().contains(&self.marker).then_some(0)
    }
}

/// Prefers the strongest signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongestSignal {
    /// Devices weaker than this (dBm) are rejected.
    pub min_rssi: Option<i16>,
}

impl TargetHeuristic for StrongestSignal {
    fn score(&self, device: &PeerDevice) -> Option<Score> {
        let rssi = device.signal_strength()?;
        match self.min_rssi {
            Some(floor) if rssi < floor => None,
            _ => Some(Score::from(rssi)),
        }
    }
}

/// Accepts only listed addresses, ranked by list position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAllowlist {
    pub addresses: Vec<PeerAddress>,
}

impl AddressAllowlist {
    pub fn new<I, A>(addresses: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<PeerAddress>,
    {
        Self {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }
}

impl TargetHeuristic for AddressAllowlist {
    fn score(&self, device: &PeerDevice) -> Option<Score> {
        let position = self.addresses.iter().position(|a| a == device.address())?;
        Some(-(position as Score))
    }
}

/// Configuration-friendly union of the built-in heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuiltinHeuristic {
    NameContains {
        #[serde(default = "default_marker")]
        marker: String,
    },
    StrongestSignal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_rssi: Option<i16>,
    },
    AddressAllowlist {
        addresses: Vec<PeerAddress>,
    },
}

fn default_marker() -> String {
    DEFAULT_NAME_MARKER.to_string()
}

impl Default for BuiltinHeuristic {
    fn default() -> Self {
        BuiltinHeuristic::NameContains {
            marker: default_marker(),
        }
    }
}

impl BuiltinHeuristic {
    /// Materialises the configured heuristic.
    pub fn build(&self) -> Box<dyn TargetHeuristic + Send + Sync> {
        match self {
            BuiltinHeuristic::NameContains { marker } => Box::new(NameContains::new(marker.as_str())),
            BuiltinHeuristic::StrongestSignal { min_rssi } => Box::new(StrongestSignal {
                min_rssi: *min_rssi,
            }),
            BuiltinHeuristic::AddressAllowlist { addresses } => Box::new(AddressAllowlist {
                addresses: addresses.clone(),
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::Sighting;
    use crate::selection::select_target;
    use std::time::{Duration, SystemTime};

    fn named(addr: &str, name: &str, seen: u64) -> PeerDevice {
        PeerDevice::from_sighting(
            Sighting::new(addr).with_name(name),
            SystemTime::UNIX_EPOCH + Duration::from_secs(seen),
        )
    }

    fn with_signal(addr: &str, rssi: i16) -> PeerDevice {
        PeerDevice::from_sighting(Sighting::new(addr).with_signal(rssi), SystemTime::UNIX_EPOCH)
    }

    // ── NameContains ──────────────────────────────────────────────────────────

    #[test]
    fn test_name_contains_matches_case_insensitively() {
        let heuristic = NameContains::new("desktop");
        assert_eq!(heuristic.score(&named("A", "DESKTOP-7F3K", 1)), Some(0));
        assert_eq!(heuristic.score(&named("B", "my-Desktop", 1)), Some(0));
        assert_eq!(heuristic.score(&named("C", "pixel-8", 1)), None);
    }

    #[test]
    fn test_name_contains_rejects_unnamed_devices() {
        let unnamed = PeerDevice::from_sighting(Sighting::new("A"), SystemTime::UNIX_EPOCH);
        assert_eq!(NameContains::default().score(&unnamed), None);
    }

    #[test]
    fn test_default_name_heuristic_picks_most_recent_match() {
        // Arrange
        let devices = vec![
            named("A", "DESKTOP-OLD", 10),
            named("B", "headphones", 30),
            named("C", "DESKTOP-NEW", 20),
        ];

        // Act
        let chosen = select_target(&devices, &NameContains::default()).unwrap();

        // Assert
        assert_eq!(chosen.address().as_str(), "C");
    }

    // ── StrongestSignal ───────────────────────────────────────────────────────

    #[test]
    fn test_strongest_signal_respects_floor() {
        let heuristic = StrongestSignal { min_rssi: Some(-70) };
        assert_eq!(heuristic.score(&with_signal("A", -60)), Some(-60));
        assert_eq!(heuristic.score(&with_signal("B", -90)), None);
    }

    #[test]
    fn test_strongest_signal_rejects_devices_without_reading() {
        let no_reading = named("A", "x", 1);
        assert_eq!(StrongestSignal::default().score(&no_reading), None);
    }

    // ── AddressAllowlist ──────────────────────────────────────────────────────

    #[test]
    fn test_allowlist_prefers_earlier_entries() {
        // Arrange
        let heuristic = AddressAllowlist::new(["bb", "aa"]);
        let devices = vec![with_signal("AA", -40), with_signal("BB", -90), with_signal("CC", -10)];

        // Act
        let chosen = select_target(&devices, &heuristic).unwrap();

        // Assert
        assert_eq!(chosen.address().as_str(), "BB");
        assert_eq!(heuristic.score(&devices[2]), None);
    }

    // ── BuiltinHeuristic ──────────────────────────────────────────────────────

    #[test]
    fn test_builtin_default_is_desktop_marker() {
        assert_eq!(
            BuiltinHeuristic::default(),
            BuiltinHeuristic::NameContains {
                marker: "DESKTOP".to_string()
            }
        );
    }

    #[test]
    fn test_builtin_deserializes_from_tagged_json() {
        let parsed: BuiltinHeuristic =
            serde_json::from_str(r#"{"kind":"strongest_signal","min_rssi":-75}"#).unwrap();
        assert_eq!(
            parsed,
            BuiltinHeuristic::StrongestSignal { min_rssi: Some(-75) }
        );

        let parsed: BuiltinHeuristic = serde_json::from_str(r#"{"kind":"name_contains"}"#).unwrap();
        assert_eq!(parsed, BuiltinHeuristic::default());
    }

    #[test]
    fn test_builtin_build_delegates_to_concrete_heuristic() {
        let heuristic = BuiltinHeuristic::AddressAllowlist {
            addresses: vec![PeerAddress::new("aa")],
        }
        .build();

        assert_eq!(heuristic.score(&with_signal("AA", -1)), Some(0));
        assert_eq!(heuristic.score(&with_signal("BB", -1)), None);
    }
}
