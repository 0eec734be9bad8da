//! Tests for configuration parsing and validation

use std::collections::BTreeMap;

use foundry_scheduler::config::{FoundryConfig, PoolConfig};

fn valid_json() -> &'static str {
    r#"{
        "pools": {
            "materials": { "resources": { "wood": 100, "iron": 50 } },
            "energy": { "resources": { "power": 10 } }
        }
    }"#
}

#[test]
fn test_parse_valid_config() {
    let cfg = FoundryConfig::from_json_str(valid_json()).unwrap();
    assert_eq!(cfg.pools.len(), 2);
    assert_eq!(cfg.pools["materials"].resources["wood"], 100);
    assert_eq!(cfg.pools["energy"].resources["power"], 10);
}

#[test]
fn test_reject_empty_pools() {
    let err = FoundryConfig::from_json_str(r#"{ "pools": {} }"#).unwrap_err();
    assert!(err.contains("at least one pool"));
}

#[test]
fn test_reject_empty_resource_table() {
    let err = FoundryConfig::from_json_str(r#"{ "pools": { "materials": { "resources": {} } } }"#)
        .unwrap_err();
    assert!(err.contains("materials"));
    assert!(err.contains("at least one resource"));
}

#[test]
fn test_reject_negative_capacity() {
    let err = FoundryConfig::from_json_str(
        r#"{ "pools": { "materials": { "resources": { "wood": -1 } } } }"#,
    )
    .unwrap_err();
    assert!(err.contains("negative capacity"));
}

#[test]
fn test_reject_blank_key() {
    let mut resources = BTreeMap::new();
    resources.insert("  ".to_string(), 5);
    let cfg = PoolConfig { resources };
    assert!(cfg.validate().unwrap_err().contains("non-empty"));
}

#[test]
fn test_reject_malformed_json() {
    let err = FoundryConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.contains("parse error"));
}

#[test]
fn test_config_round_trips_through_json() {
    let cfg = FoundryConfig::from_json_str(valid_json()).unwrap();
    let json = serde_json::to_string(&cfg).unwrap();
    let reparsed = FoundryConfig::from_json_str(&json).unwrap();
    assert_eq!(
        reparsed.pools["materials"].resources,
        cfg.pools["materials"].resources
    );
}
