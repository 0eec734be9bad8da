//! Tests for utility functions

use foundry_scheduler::util::{now_ms, ControllerToken, StationId};

#[test]
fn test_now_ms_is_past_the_epoch() {
    let first = now_ms();
    assert!(first > 0);
    assert!(now_ms() >= first);
}

#[test]
fn test_station_id_display_and_equality() {
    let id = StationId::new("refinery-2");
    assert_eq!(format!("{id}"), "refinery-2");
    assert_eq!(id, StationId::from("refinery-2".to_string()));
    assert_ne!(id, StationId::new("refinery-3"));
}

#[test]
fn test_station_id_serde_round_trip() {
    let id = StationId::new("refinery-2");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"refinery-2\"");
    let parsed: StationId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn test_init_tracing_is_reentrant() {
    foundry_scheduler::util::init_tracing();
    // A second call finds a subscriber installed and backs off.
    foundry_scheduler::util::init_tracing();
}

#[test]
fn test_controller_token_round_trip() {
    let token = ControllerToken::new(42);
    assert_eq!(token.raw(), 42);
    let json = serde_json::to_string(&token).unwrap();
    let parsed: ControllerToken = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, token);
}
