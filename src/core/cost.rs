//! Cost and craftable contracts consumed by the scheduler.
//!
//! The scheduler never touches the allocation pool directly: it only ever
//! calls [`Cost::withdraw`] before a job starts and [`Cost::payback`] when a
//! job is cancelled, so any resource backend can be substituted — including a
//! stub in tests. [`RecipeCost`] is the standard pool-backed implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::pool::{AllocationRequest, ResourceAllocationPool, ResourceKey};
use crate::util::serde::StationId;

/// Resource-withdrawal contract a craftable must satisfy before its job may
/// enter processing.
pub trait Cost: fmt::Debug + Send + Sync {
    /// Reserve this cost on behalf of `station`.
    ///
    /// Returns the allocation id backing the withdrawal so the caller can pay
    /// it back later; `None` means the withdrawal was refused and nothing was
    /// reserved.
    fn withdraw(&self, station: &StationId) -> Option<Uuid>;

    /// Return a previously withdrawn cost. `false` when nothing was refunded.
    fn payback(&self, station: &StationId, allocation: Uuid) -> bool;
}

/// Item that can be queued on a production station.
pub trait Craftable: fmt::Debug + Send + Sync {
    /// Whether a batch of `amount` may be scheduled at all.
    fn validate_requirements(&self, amount: u32) -> bool;

    /// Seconds one unit takes to process.
    fn duration(&self) -> f32;

    /// The cost withdrawn per unit, if any. Jobs without a cost never start.
    fn cost(&self) -> Option<Arc<dyn Cost>>;
}

/// [`Cost`] backed by a [`ResourceAllocationPool`].
///
/// Withdrawal is an all-or-nothing allocation owned by the station id, so
/// everything a station holds can also be bulk-released through
/// [`ResourceAllocationPool::release_by_owner`].
pub struct RecipeCost {
    pool: Arc<ResourceAllocationPool>,
    resources: BTreeMap<ResourceKey, i64>,
}

impl RecipeCost {
    /// A cost drawing `resources` from `pool`.
    pub fn new(pool: Arc<ResourceAllocationPool>, resources: BTreeMap<ResourceKey, i64>) -> Self {
        Self { pool, resources }
    }

    /// The per-key amounts this cost withdraws.
    pub fn resources(&self) -> &BTreeMap<ResourceKey, i64> {
        &self.resources
    }
}

impl fmt::Debug for RecipeCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeCost")
            .field("resources", &self.resources)
            .finish_non_exhaustive()
    }
}

impl Cost for RecipeCost {
    fn withdraw(&self, station: &StationId) -> Option<Uuid> {
        let request = AllocationRequest::all_or_nothing(self.resources.clone())
            .with_owner(station.as_str())
            .with_context("craft cost");
        match self.pool.try_allocate(&request) {
            Ok(allocation) => Some(allocation.id),
            Err(err) => {
                tracing::debug!(station = %station, %err, "cost withdrawal refused");
                None
            }
        }
    }

    fn payback(&self, station: &StationId, allocation: Uuid) -> bool {
        match self.pool.release(allocation) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(station = %station, %allocation, %err, "cost payback failed");
                false
            }
        }
    }
}

/// Minimal [`Craftable`]: a name, a fixed duration, an optional cost, and a
/// batch-size cap.
#[derive(Debug)]
pub struct Recipe {
    name: String,
    duration: f32,
    cost: Option<Arc<dyn Cost>>,
    max_batch: u32,
}

impl Recipe {
    /// A recipe with no cost and no batch cap.
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            cost: None,
            max_batch: u32::MAX,
        }
    }

    /// Attach the cost withdrawn per unit.
    #[must_use]
    pub fn with_cost(mut self, cost: Arc<dyn Cost>) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Cap the batch size `validate_requirements` accepts.
    #[must_use]
    pub const fn with_max_batch(mut self, max_batch: u32) -> Self {
        self.max_batch = max_batch;
        self
    }

    /// Recipe name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Craftable for Recipe {
    fn validate_requirements(&self, amount: u32) -> bool {
        amount >= 1 && amount <= self.max_batch
    }

    fn duration(&self) -> f32 {
        self.duration
    }

    fn cost(&self) -> Option<Arc<dyn Cost>> {
        self.cost.clone()
    }
}
