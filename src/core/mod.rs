//! Allocation pool, production scheduler, and the contracts between them.

pub mod cost;
pub mod error;
pub mod events;
pub mod pool;
pub mod scheduler;

pub use cost::{Cost, Craftable, Recipe, RecipeCost};
pub use error::{AppResult, PoolError, SchedulerError};
pub use events::{Event, EventSink, NullEventSink, PoolEvent, StationEvent};
pub use pool::{
    Allocation, AllocationInfo, AllocationRequest, PoolSnapshot, ResourceAllocationPool,
    ResourceEntry, ResourceKey, ResourceTotals,
};
pub use scheduler::{ProcessState, ProductionScheduler, StationInfo, StationState};
