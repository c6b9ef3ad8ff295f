//! Integration tests for the registry and selector through the public API.
//!
//! These cover the observable guarantees callers rely on:
//!
//! - one record per address, however often (and in whatever case) it is seen;
//! - `last_seen_at` tracks the most recent sighting;
//! - first-seen ordering is stable under re-sightings;
//! - selection is deterministic and returns nothing when nothing matches.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use peerlink_core::{
    select_target, DeviceRegistry, NameContains, PeerAddress, PeerDevice, Score, Sighting,
};

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn test_repeated_sightings_leave_one_record_per_address_with_latest_timestamp() {
    // Arrange: a stream with heavy repetition and mixed case.
    let stream = [
        "aa:01", "bb:02", "AA:01", "cc:03", "bb:02", "Aa:01", "dd:04", "cc:03", "BB:02",
    ];
    let mut registry = DeviceRegistry::new();
    let mut expected_last: HashMap<PeerAddress, SystemTime> = HashMap::new();

    // Act
    for (i, raw) in stream.iter().enumerate() {
        let ts = at(i as u64 * 3);
        registry.record_sighting_at(Sighting::new(*raw), ts);
        expected_last.insert(PeerAddress::new(raw), ts);
    }

    // Assert
    assert_eq!(registry.len(), expected_last.len());
    for device in registry.list_all() {
        assert_eq!(
            device.last_seen_at(),
            expected_last[device.address()],
            "last_seen_at must equal the most recent sighting of {}",
            device.address()
        );
    }
}

#[test]
fn test_order_is_first_seen_not_last_updated() {
    let mut registry = DeviceRegistry::new();
    for (i, addr) in ["A", "B", "A", "C"].iter().enumerate() {
        registry.record_sighting_at(Sighting::new(*addr), at(i as u64));
    }

    let order: Vec<String> = registry
        .list_all()
        .iter()
        .map(|d| d.address().to_string())
        .collect();

    assert_eq!(order, ["A", "B", "C"]);
}

#[test]
fn test_selector_over_registry_contents_is_repeatable() {
    // Arrange
    let mut registry = DeviceRegistry::new();
    registry.record_sighting_at(Sighting::new("01").with_name("DESKTOP-A"), at(1));
    registry.record_sighting_at(Sighting::new("02").with_name("speaker"), at(2));
    registry.record_sighting_at(Sighting::new("03").with_name("desktop-b"), at(3));
    let heuristic = NameContains::default();

    // Act
    let picks: Vec<Option<PeerAddress>> = (0..5)
        .map(|_| select_target(registry.list_all(), &heuristic).map(|d| d.address().clone()))
        .collect();

    // Assert
    assert!(picks.iter().all(|p| p == &Some(PeerAddress::new("03"))));
}

#[test]
fn test_selector_returns_none_when_no_device_matches() {
    let mut registry = DeviceRegistry::new();
    registry.record_sighting(Sighting::new("01").with_name("watch"));
    registry.record_sighting(Sighting::new("02"));

    assert!(select_target(registry.list_all(), &NameContains::default()).is_none());
}

#[test]
fn test_custom_closure_heuristic_can_replace_default() {
    let mut registry = DeviceRegistry::new();
    registry.record_sighting(Sighting::new("01").with_name("DESKTOP"));
    registry.record_sighting(Sighting::new("02").with_name("printer"));

    let printers_only =
        |d: &PeerDevice| -> Option<Score> { d.display_name()?.contains("printer").then_some(1) };

    let chosen = select_target(registry.list_all(), &printers_only).unwrap();
    assert_eq!(chosen.address().as_str(), "02");
}
