//! Tests for builder modules

use std::collections::HashMap;
use std::sync::Arc;

use foundry_scheduler::builders::build_pools;
use foundry_scheduler::config::FoundryConfig;
use foundry_scheduler::core::{Event, NullEventSink, PoolError, PoolEvent};
use foundry_scheduler::infra::InMemoryEventSink;

#[test]
fn test_build_pools_from_config() {
    let cfg = FoundryConfig::from_json_str(
        r#"{
            "pools": {
                "materials": { "resources": { "wood": 100, "iron": 50 } },
                "energy": { "resources": { "power": 10 } }
            }
        }"#,
    )
    .unwrap();

    let pools = build_pools(&cfg, |_, _| Arc::new(NullEventSink)).unwrap();
    assert_eq!(pools.len(), 2);
    assert_eq!(pools["materials"].capacity("wood"), Some(100));
    assert_eq!(pools["materials"].available("iron"), Some(50));
    assert_eq!(pools["energy"].capacity("power"), Some(10));
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let cfg = FoundryConfig {
        pools: HashMap::new(),
    };
    assert!(matches!(
        build_pools(&cfg, |_, _| Arc::new(NullEventSink)),
        Err(PoolError::Invalid(_))
    ));
}

#[test]
fn test_sink_factory_sees_each_pool_definition() {
    let cfg = FoundryConfig::from_json_str(
        r#"{ "pools": { "materials": { "resources": { "wood": 100 } } } }"#,
    )
    .unwrap();

    let sink = Arc::new(InMemoryEventSink::new(16));
    let pools = build_pools(&cfg, |name, _| {
        assert_eq!(name, "materials");
        sink.clone()
    })
    .unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(
        sink.events(),
        vec![Event::Pool(PoolEvent::ResourceDefined {
            key: "wood".into(),
            capacity: 100
        })]
    );
}
