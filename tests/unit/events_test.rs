//! Tests for event envelopes and sinks

use std::collections::BTreeMap;

use foundry_scheduler::core::{Event, EventSink, NullEventSink, PoolEvent, StationEvent};
use foundry_scheduler::util::serde::StationId;
use uuid::Uuid;

#[test]
fn test_pool_events_wrap_into_the_envelope() {
    let event: Event = PoolEvent::ResourceDefined {
        key: "wood".into(),
        capacity: 100,
    }
    .into();
    assert!(matches!(
        event,
        Event::Pool(PoolEvent::ResourceDefined { .. })
    ));
}

#[test]
fn test_station_events_wrap_into_the_envelope() {
    let event: Event = StationEvent::Stopped {
        station: StationId::new("forge"),
    }
    .into();
    assert!(matches!(
        event,
        Event::Station(StationEvent::Stopped { .. })
    ));
}

#[test]
fn test_events_compare_structurally() {
    let granted = |id: Uuid| {
        Event::Pool(PoolEvent::AllocationGranted {
            id,
            owner: Some("forge".into()),
            granted: BTreeMap::from([("wood".to_string(), 10)]),
        })
    };
    let id = Uuid::new_v4();
    assert_eq!(granted(id), granted(id));
    assert_ne!(granted(id), granted(Uuid::new_v4()));
}

#[test]
fn test_null_sink_swallows_everything() {
    let sink = NullEventSink;
    sink.publish(Event::Station(StationEvent::Stopped {
        station: StationId::new("forge"),
    }));
}
