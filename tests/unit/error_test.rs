//! Tests for error types

use std::collections::BTreeMap;

use foundry_scheduler::core::{PoolError, SchedulerError, StationState};
use foundry_scheduler::util::serde::StationId;
use uuid::Uuid;

#[test]
fn test_invalid_error() {
    let err = PoolError::Invalid("empty resource key".to_string());
    assert_eq!(format!("{err}"), "invalid request: empty resource key");
}

#[test]
fn test_unknown_resource_error() {
    let err = PoolError::UnknownResource("wood".to_string());
    assert_eq!(format!("{err}"), "unknown resource `wood`");
}

#[test]
fn test_insufficient_error_lists_exact_shortages() {
    let mut shortages = BTreeMap::new();
    shortages.insert("iron".to_string(), 15);
    shortages.insert("wood".to_string(), 10);
    let err = PoolError::Insufficient { shortages };
    assert_eq!(
        format!("{err}"),
        "insufficient resources: iron short by 15, wood short by 10"
    );
}

#[test]
fn test_capacity_below_allocation_error() {
    let err = PoolError::CapacityBelowAllocation {
        key: "wood".to_string(),
        requested: 50,
        allocated: 60,
    };
    assert_eq!(
        format!("{err}"),
        "capacity 50 for `wood` is below allocated total 60"
    );
}

#[test]
fn test_live_allocations_error() {
    let err = PoolError::LiveAllocations(3);
    assert_eq!(format!("{err}"), "3 live allocations block snapshot load");
}

#[test]
fn test_unknown_allocation_error_carries_the_id() {
    let id = Uuid::new_v4();
    let err = PoolError::UnknownAllocation(id);
    assert_eq!(format!("{err}"), format!("unknown allocation {id}"));
}

#[test]
fn test_unknown_station_error() {
    let err = SchedulerError::UnknownStation(StationId::new("forge"));
    assert_eq!(format!("{err}"), "station `forge` is not registered");
}

#[test]
fn test_invalid_state_error() {
    let err = SchedulerError::InvalidState {
        station: StationId::new("forge"),
        state: StationState::Crafting,
        action: "start",
    };
    assert_eq!(
        format!("{err}"),
        "station `forge` cannot start while crafting"
    );
}

#[test]
fn test_missing_cost_error() {
    let err = SchedulerError::MissingCost;
    assert_eq!(format!("{err}"), "craftable does not define a cost");
}

#[test]
fn test_cost_rejected_error() {
    let err = SchedulerError::CostRejected(StationId::new("forge"));
    assert_eq!(
        format!("{err}"),
        "cost withdrawal rejected for station `forge`"
    );
}
