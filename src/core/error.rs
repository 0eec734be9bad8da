//! Error types for pool and scheduler operations.

use std::collections::BTreeMap;

use thiserror::Error;
use uuid::Uuid;

use crate::core::scheduler::StationState;
use crate::util::serde::StationId;

/// Errors produced by the resource allocation pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Malformed request: empty key, non-positive amount, bad snapshot entry.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// No resource is registered under the key.
    #[error("unknown resource `{0}`")]
    UnknownResource(String),
    /// No live allocation exists with the id.
    #[error("unknown allocation {0}")]
    UnknownAllocation(Uuid),
    /// An all-or-nothing request could not be fully satisfied.
    ///
    /// Running out of a resource is an ordinary business outcome, not a bug;
    /// callers branch on this variant and inspect the exact shortages.
    #[error("insufficient resources: {}", shortage_summary(.shortages))]
    Insufficient {
        /// Per-key amount still missing after counting what is available.
        shortages: BTreeMap<String, i64>,
    },
    /// The resource is still referenced by live allocations.
    #[error("resource `{0}` has live allocations")]
    ResourceInUse(String),
    /// A resize would drop capacity below what is currently allocated.
    #[error("capacity {requested} for `{key}` is below allocated total {allocated}")]
    CapacityBelowAllocation {
        /// Resource being resized.
        key: String,
        /// Capacity the caller asked for.
        requested: i64,
        /// Amount currently allocated from the pool.
        allocated: i64,
    },
    /// A snapshot load was attempted while allocations are live.
    #[error("{0} live allocations block snapshot load")]
    LiveAllocations(usize),
    /// An internal invariant was violated; pool state can no longer be trusted.
    #[error("pool state corrupted: {0}")]
    Corrupted(String),
}

fn shortage_summary(shortages: &BTreeMap<String, i64>) -> String {
    let parts: Vec<String> = shortages
        .iter()
        .map(|(key, missing)| format!("{key} short by {missing}"))
        .collect();
    parts.join(", ")
}

/// Errors produced by the production scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No station is registered under the id.
    #[error("station `{0}` is not registered")]
    UnknownStation(StationId),
    /// The station is in the wrong state for the requested transition.
    #[error("station `{station}` cannot {action} while {state}")]
    InvalidState {
        /// Station the caller addressed.
        station: StationId,
        /// State the station was actually in.
        state: StationState,
        /// Transition that was requested.
        action: &'static str,
    },
    /// The craftable refused the requested batch size.
    #[error("craftable rejected a batch of {0}")]
    RequirementsNotMet(u32),
    /// The craftable defines no cost, so its jobs can never start.
    #[error("craftable does not define a cost")]
    MissingCost,
    /// The cost contract refused the withdrawal.
    #[error("cost withdrawal rejected for station `{0}`")]
    CostRejected(StationId),
    /// An internal invariant was violated; scheduler state is inconsistent.
    #[error("scheduler state corrupted: {0}")]
    Corrupted(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
