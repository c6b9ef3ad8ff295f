//! Target selection: pick zero or one peer from a device list.
//!
//! Selection is split into two parts:
//!
//! - A [`TargetHeuristic`] decides whether a device is acceptable at all and,
//!   if so, how good a match it is (a [`Score`]; higher is better).
//! - [`select_target`] applies a heuristic over a device list and returns the
//!   best match.
//!
//! Ties on score go to the device with the most recent `last_seen_at`.  If
//! that also ties, the device that appears first in the list wins, so the
//! result is fully deterministic for identical inputs.
//!
//! Any `Fn(&PeerDevice) -> Option<Score>` closure is a heuristic, so callers
//! can plug in their own rule without defining a type.

pub mod heuristics;

use crate::domain::device::PeerDevice;

/// Match quality.  Higher is better.
pub type Score = i64;

/// A pluggable scoring rule for target selection.
pub trait TargetHeuristic {
    /// Scores `device`, or returns `None` if it fails the heuristic's
    /// minimum-acceptance criterion.
    fn score(&self, device: &PeerDevice) -> Option<Score>;
}

impl<F> TargetHeuristic for F
where
    F: Fn(&PeerDevice) -> Option<Score>,
{
    fn score(&self, device: &PeerDevice) -> Option<Score> {
        self(device)
    }
}

/// Returns the highest-scoring acceptable device, or `None` if no device is
/// acceptable.
///
/// Pure: the input is not modified and no I/O is performed.
pub fn select_target<'a, H>(devices: &'a [PeerDevice], heuristic: &H) -> Option<&'a PeerDevice>
where
    H: TargetHeuristic + ?Sized,
{
    let mut best: Option<(&PeerDevice, Score)> = None;

    for device in devices {
        let Some(score) = heuristic.score(device) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((current, best_score)) => {
                score > best_score
                    || (score == best_score && device.last_seen_at() > current.last_seen_at())
            }
        };
        if better {
            best = Some((device, score));
        }
    }

    best.map(|(device, _)| device)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device::Sighting;
    use std::time::{Duration, SystemTime};

    fn device(addr: &str, name: Option<&str>, rssi: Option<i16>, seen: u64) -> PeerDevice {
        let mut sighting = Sighting::new(addr);
        sighting.display_name = name.map(str::to_string);
        sighting.signal_strength = rssi;
        PeerDevice::from_sighting(sighting, SystemTime::UNIX_EPOCH + Duration::from_secs(seen))
    }

    #[test]
    fn test_select_target_returns_none_for_empty_list() {
        let accept_all = |_: &PeerDevice| Some::<Score>(0);
        assert!(select_target(&[], &accept_all).is_none());
    }

    #[test]
    fn test_select_target_returns_none_when_nothing_is_acceptable() {
        // Arrange
        let devices = vec![device("A", Some("phone"), None, 1)];
        let reject_all = |_: &PeerDevice| None::<Score>;

        // Act / Assert
        assert!(select_target(&devices, &reject_all).is_none());
    }

    #[test]
    fn test_select_target_prefers_highest_score() {
        let devices = vec![
            device("A", None, Some(-80), 1),
            device("B", None, Some(-40), 1),
            device("C", None, Some(-60), 1),
        ];
        let by_signal = |d: &PeerDevice| d.signal_strength().map(Score::from);

        let chosen = select_target(&devices, &by_signal).unwrap();

        assert_eq!(chosen.address().as_str(), "B");
    }

    #[test]
    fn test_select_target_breaks_ties_by_most_recent_sighting() {
        let devices = vec![
            device("A", None, None, 5),
            device("B", None, None, 9),
            device("C", None, None, 7),
        ];
        let flat = |_: &PeerDevice| Some::<Score>(1);

        let chosen = select_target(&devices, &flat).unwrap();

        assert_eq!(chosen.address().as_str(), "B");
    }

    #[test]
    fn test_select_target_full_tie_picks_first_in_list() {
        let devices = vec![device("A", None, None, 5), device("B", None, None, 5)];
        let flat = |_: &PeerDevice| Some::<Score>(1);

        assert_eq!(
            select_target(&devices, &flat).unwrap().address().as_str(),
            "A"
        );
    }

    #[test]
    fn test_select_target_is_deterministic_across_calls() {
        let devices = vec![
            device("A", Some("x"), Some(-50), 3),
            device("B", Some("y"), Some(-50), 3),
        ];
        let by_signal = |d: &PeerDevice| d.signal_strength().map(Score::from);

        let first = select_target(&devices, &by_signal).map(|d| d.address().clone());
        let second = select_target(&devices, &by_signal).map(|d| d.address().clone());

        assert_eq!(first, second);
    }

    #[test]
    fn test_select_target_accepts_trait_objects() {
        let devices = vec![device("A", None, None, 1)];
        let heuristic: Box<dyn TargetHeuristic> = Box::new(|_: &PeerDevice| Some::<Score>(0));

        assert!(select_target(&devices, heuristic.as_ref()).is_some());
    }
}
