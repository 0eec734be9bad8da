//! Capacity-bounded named resource pools with atomic reservation.
//!
//! One [`ResourceAllocationPool`] holds any number of named pools, each a
//! `(capacity, allocated)` pair. Reservations span multiple keys and commit
//! atomically: either the whole request is applied or nothing is.
//!
//! A single `parking_lot::Mutex` serializes every mutation and read, which
//! keeps snapshots linearizable and the invariant `0 <= allocated <= capacity`
//! checkable at any point. Event publication is queued while the lock is held
//! and executed after it drops, so subscriber callbacks can never re-enter the
//! pool mid-mutation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::PoolError;
use crate::core::events::{Event, EventSink, NullEventSink, PoolEvent};
use crate::util::clock::now_ms;

/// Name of one bounded resource pool.
pub type ResourceKey = String;

/// Capacity accounting for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResourceState {
    capacity: i64,
    allocated: i64,
}

impl ResourceState {
    const fn available(self) -> i64 {
        self.capacity - self.allocated
    }
}

/// A committed reservation. Owned exclusively by the pool; callers only ever
/// see [`AllocationInfo`] copies.
#[derive(Debug, Clone)]
struct AllocationRecord {
    id: Uuid,
    owner: Option<String>,
    created_at_ms: u128,
    resources: BTreeMap<ResourceKey, i64>,
    tags: Vec<String>,
    context: String,
}

/// Caller-facing copy of a live allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationInfo {
    /// Allocation id.
    pub id: Uuid,
    /// Owner tag, when the request carried one.
    pub owner: Option<String>,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at_ms: u128,
    /// Amounts currently held per key, all positive.
    pub resources: BTreeMap<ResourceKey, i64>,
    /// Free-form tags from the request.
    pub tags: Vec<String>,
    /// Free-form context string from the request.
    pub context: String,
}

impl AllocationRecord {
    fn info(&self) -> AllocationInfo {
        AllocationInfo {
            id: self.id,
            owner: self.owner.clone(),
            created_at_ms: self.created_at_ms,
            resources: self.resources.clone(),
            tags: self.tags.clone(),
            context: self.context.clone(),
        }
    }
}

/// Request passed to [`ResourceAllocationPool::try_allocate`].
#[derive(Debug, Clone, Default)]
pub struct AllocationRequest {
    /// Optional owner tag grouping allocations for bulk release.
    pub owner: Option<String>,
    /// Requested amount per key, all positive.
    pub resources: BTreeMap<ResourceKey, i64>,
    /// When set, the request aborts unless every key can be granted in full.
    pub all_or_nothing: bool,
    /// Free-form tags stored on the resulting allocation.
    pub tags: Vec<String>,
    /// Free-form context stored on the resulting allocation.
    pub context: String,
}

impl AllocationRequest {
    /// Request that grants everything or nothing.
    pub fn all_or_nothing(resources: BTreeMap<ResourceKey, i64>) -> Self {
        Self {
            resources,
            all_or_nothing: true,
            ..Self::default()
        }
    }

    /// Request that grants each key independently up to availability.
    ///
    /// A best-effort request can succeed while delivering less than asked on
    /// some keys; callers doing cost math must check [`Allocation::granted`].
    pub fn best_effort(resources: BTreeMap<ResourceKey, i64>) -> Self {
        Self {
            resources,
            all_or_nothing: false,
            ..Self::default()
        }
    }

    /// Attach an owner tag.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Attach a free-form tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Attach a context string.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Successful outcome of [`ResourceAllocationPool::try_allocate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Id to pass back to [`ResourceAllocationPool::release`].
    pub id: Uuid,
    /// Exactly what was granted per key. Under all-or-nothing this equals the
    /// request; best-effort grants may be smaller and omit exhausted keys.
    pub granted: BTreeMap<ResourceKey, i64>,
}

/// Per-key totals returned by [`ResourceAllocationPool::totals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTotals {
    /// Configured capacity.
    pub capacity: i64,
    /// Amount currently allocated.
    pub allocated: i64,
    /// Capacity minus allocated.
    pub available: i64,
}

/// One entry of a flat capacity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource key.
    pub key: ResourceKey,
    /// Configured capacity.
    pub capacity: i64,
    /// Amount allocated at snapshot time.
    pub allocated: i64,
}

/// Flat, serializable export of every pool's capacity and occupancy.
///
/// Round-trips through [`ResourceAllocationPool::snapshot`] and
/// [`ResourceAllocationPool::load_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Entries sorted by key.
    pub resources: Vec<ResourceEntry>,
}

#[derive(Default)]
struct PoolState {
    resources: HashMap<ResourceKey, ResourceState>,
    allocations: HashMap<Uuid, AllocationRecord>,
}

/// Thread-safe, capacity-bounded allocation pool.
///
/// Safe to share across threads behind an `Arc`; all methods take `&self`.
/// Requests are served strictly in lock-acquisition order.
pub struct ResourceAllocationPool {
    state: Mutex<PoolState>,
    sink: Arc<dyn EventSink>,
}

impl Default for ResourceAllocationPool {
    fn default() -> Self {
        Self::new(Arc::new(NullEventSink))
    }
}

impl ResourceAllocationPool {
    /// Create an empty pool publishing to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: Mutex::new(PoolState::default()),
            sink,
        }
    }

    fn publish(&self, pending: Vec<PoolEvent>) {
        for event in pending {
            self.sink.publish(Event::Pool(event));
        }
    }

    /// Register a resource pool or resize an existing one. Idempotent.
    ///
    /// Fails when the key is empty, the capacity is negative, or the resize
    /// would drop below the amount currently allocated.
    pub fn define_resource(&self, key: &str, capacity: i64) -> Result<(), PoolError> {
        validate_key(key)?;
        validate_capacity(key, capacity)?;
        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            if let Some(res) = state.resources.get_mut(key) {
                if capacity < res.allocated {
                    return Err(PoolError::CapacityBelowAllocation {
                        key: key.to_owned(),
                        requested: capacity,
                        allocated: res.allocated,
                    });
                }
                if res.capacity != capacity {
                    let previous = res.capacity;
                    res.capacity = capacity;
                    pending.push(PoolEvent::CapacityChanged {
                        key: key.to_owned(),
                        previous,
                        capacity,
                    });
                }
            } else {
                state.resources.insert(
                    key.to_owned(),
                    ResourceState {
                        capacity,
                        allocated: 0,
                    },
                );
                tracing::info!(key, capacity, "resource defined");
                pending.push(PoolEvent::ResourceDefined {
                    key: key.to_owned(),
                    capacity,
                });
            }
        }
        self.publish(pending);
        Ok(())
    }

    /// Remove a resource pool. Fails while any live allocation references it.
    pub fn remove_resource(&self, key: &str) -> Result<(), PoolError> {
        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            if !state.resources.contains_key(key) {
                return Err(PoolError::UnknownResource(key.to_owned()));
            }
            if state
                .allocations
                .values()
                .any(|record| record.resources.contains_key(key))
            {
                return Err(PoolError::ResourceInUse(key.to_owned()));
            }
            state.resources.remove(key);
            pending.push(PoolEvent::ResourceRemoved {
                key: key.to_owned(),
            });
        }
        self.publish(pending);
        Ok(())
    }

    /// Atomically reserve resources across one or more keys.
    ///
    /// Under `all_or_nothing` the request aborts with
    /// [`PoolError::Insufficient`] — and zero mutation — when any key falls
    /// short. Otherwise each key is granted `min(requested, available)`
    /// independently. A zero-length request succeeds trivially with an empty
    /// allocation.
    pub fn try_allocate(&self, request: &AllocationRequest) -> Result<Allocation, PoolError> {
        for (key, amount) in &request.resources {
            validate_key(key)?;
            if *amount <= 0 {
                return Err(PoolError::Invalid(format!(
                    "non-positive amount {amount} for `{key}`"
                )));
            }
        }
        let mut pending = Vec::new();
        let allocation = {
            let mut state = self.state.lock();
            for key in request.resources.keys() {
                if !state.resources.contains_key(key) {
                    return Err(PoolError::UnknownResource(key.clone()));
                }
            }

            let mut shortages = BTreeMap::new();
            for (key, amount) in &request.resources {
                let available = state.resources[key].available();
                if *amount > available {
                    shortages.insert(key.clone(), *amount - available);
                }
            }
            if request.all_or_nothing && !shortages.is_empty() {
                tracing::debug!(owner = ?request.owner, ?shortages, "allocation rejected");
                pending.push(PoolEvent::AllocationRejected {
                    owner: request.owner.clone(),
                    shortages: shortages.clone(),
                });
                drop(state);
                self.publish(pending);
                return Err(PoolError::Insufficient { shortages });
            }

            // Plan the whole commit before touching any counter, so a guard
            // trip leaves the pool byte-for-byte unchanged.
            let mut grants: Vec<(ResourceKey, i64)> = Vec::with_capacity(request.resources.len());
            for (key, amount) in &request.resources {
                let res = state.resources[key];
                let grant = if request.all_or_nothing {
                    *amount
                } else {
                    (*amount).min(res.available())
                };
                if grant == 0 {
                    continue;
                }
                let Some(next) = res.allocated.checked_add(grant) else {
                    return Err(PoolError::Corrupted(format!(
                        "allocated total overflow for `{key}`"
                    )));
                };
                if next > res.capacity {
                    return Err(PoolError::Corrupted(format!(
                        "allocation would exceed capacity for `{key}`"
                    )));
                }
                grants.push((key.clone(), grant));
            }
            for (key, grant) in &grants {
                if let Some(res) = state.resources.get_mut(key) {
                    res.allocated += grant;
                }
            }

            let record = AllocationRecord {
                id: Uuid::new_v4(),
                owner: request.owner.clone(),
                created_at_ms: now_ms(),
                resources: grants.into_iter().collect(),
                tags: request.tags.clone(),
                context: request.context.clone(),
            };
            let allocation = Allocation {
                id: record.id,
                granted: record.resources.clone(),
            };
            tracing::debug!(id = %record.id, owner = ?record.owner, granted = ?record.resources, "allocation granted");
            pending.push(PoolEvent::AllocationGranted {
                id: record.id,
                owner: record.owner.clone(),
                granted: record.resources.clone(),
            });
            state.allocations.insert(record.id, record);
            allocation
        };
        self.publish(pending);
        Ok(allocation)
    }

    /// Release an allocation in full, crediting every held amount back.
    ///
    /// Not idempotent: a second release of the same id fails with
    /// [`PoolError::UnknownAllocation`] and credits nothing.
    pub fn release(&self, id: Uuid) -> Result<(), PoolError> {
        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            let resources = state
                .allocations
                .get(&id)
                .map(|record| record.resources.clone())
                .ok_or(PoolError::UnknownAllocation(id))?;
            credit(&mut state, &resources)?;
            state.allocations.remove(&id);
            tracing::debug!(%id, "allocation released");
            pending.push(PoolEvent::AllocationReleased { id });
        }
        self.publish(pending);
        Ok(())
    }

    /// Credit back part of an allocation.
    ///
    /// Every `(key, amount)` is validated against what the record actually
    /// holds before anything is applied. The record shrinks by the returned
    /// amounts and is destroyed when nothing remains.
    pub fn release_partial(
        &self,
        id: Uuid,
        amounts: &BTreeMap<ResourceKey, i64>,
    ) -> Result<(), PoolError> {
        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            let held = state
                .allocations
                .get(&id)
                .map(|record| record.resources.clone())
                .ok_or(PoolError::UnknownAllocation(id))?;
            for (key, amount) in amounts {
                if *amount <= 0 {
                    return Err(PoolError::Invalid(format!(
                        "non-positive amount {amount} for `{key}`"
                    )));
                }
                let available = held.get(key).copied().unwrap_or(0);
                if *amount > available {
                    return Err(PoolError::Invalid(format!(
                        "allocation {id} holds {available} of `{key}`, cannot return {amount}"
                    )));
                }
            }
            credit(&mut state, amounts)?;
            let emptied = {
                let Some(record) = state.allocations.get_mut(&id) else {
                    return Err(PoolError::UnknownAllocation(id));
                };
                for (key, amount) in amounts {
                    if let Some(held) = record.resources.get_mut(key) {
                        *held -= amount;
                        if *held == 0 {
                            record.resources.remove(key);
                        }
                    }
                }
                record.resources.is_empty()
            };
            if emptied {
                state.allocations.remove(&id);
                pending.push(PoolEvent::AllocationReleased { id });
            } else {
                pending.push(PoolEvent::AllocationPartiallyReleased {
                    id,
                    returned: amounts.clone(),
                });
            }
        }
        self.publish(pending);
        Ok(())
    }

    /// Release every allocation carrying the owner tag. Returns how many were
    /// released; zero is not an error.
    pub fn release_by_owner(&self, owner: &str) -> Result<usize, PoolError> {
        let mut pending = Vec::new();
        let released = {
            let mut state = self.state.lock();
            let ids: Vec<Uuid> = state
                .allocations
                .values()
                .filter(|record| record.owner.as_deref() == Some(owner))
                .map(|record| record.id)
                .collect();
            for id in &ids {
                let resources = state
                    .allocations
                    .get(id)
                    .map(|record| record.resources.clone())
                    .ok_or(PoolError::UnknownAllocation(*id))?;
                credit(&mut state, &resources)?;
                state.allocations.remove(id);
                pending.push(PoolEvent::AllocationReleased { id: *id });
            }
            ids.len()
        };
        if released > 0 {
            tracing::debug!(owner, released, "allocations released by owner");
        }
        self.publish(pending);
        Ok(released)
    }

    /// Resize an existing resource pool. Fails below the live allocation.
    pub fn set_capacity(&self, key: &str, capacity: i64) -> Result<(), PoolError> {
        validate_capacity(key, capacity)?;
        let mut pending = Vec::new();
        {
            let mut state = self.state.lock();
            let Some(res) = state.resources.get_mut(key) else {
                return Err(PoolError::UnknownResource(key.to_owned()));
            };
            if capacity < res.allocated {
                return Err(PoolError::CapacityBelowAllocation {
                    key: key.to_owned(),
                    requested: capacity,
                    allocated: res.allocated,
                });
            }
            if res.capacity != capacity {
                let previous = res.capacity;
                res.capacity = capacity;
                pending.push(PoolEvent::CapacityChanged {
                    key: key.to_owned(),
                    previous,
                    capacity,
                });
            }
        }
        self.publish(pending);
        Ok(())
    }

    /// Grow or shrink capacity by a signed delta. Returns the new capacity.
    pub fn adjust_capacity(&self, key: &str, delta: i64) -> Result<i64, PoolError> {
        let mut pending = Vec::new();
        let capacity = {
            let mut state = self.state.lock();
            let Some(res) = state.resources.get_mut(key) else {
                return Err(PoolError::UnknownResource(key.to_owned()));
            };
            let Some(capacity) = res.capacity.checked_add(delta) else {
                return Err(PoolError::Invalid(format!(
                    "capacity overflow adjusting `{key}` by {delta}"
                )));
            };
            if capacity < 0 {
                return Err(PoolError::Invalid(format!(
                    "negative capacity {capacity} for `{key}`"
                )));
            }
            if capacity < res.allocated {
                return Err(PoolError::CapacityBelowAllocation {
                    key: key.to_owned(),
                    requested: capacity,
                    allocated: res.allocated,
                });
            }
            if delta != 0 {
                let previous = res.capacity;
                res.capacity = capacity;
                pending.push(PoolEvent::CapacityChanged {
                    key: key.to_owned(),
                    previous,
                    capacity,
                });
            }
            capacity
        };
        self.publish(pending);
        Ok(capacity)
    }

    /// Configured capacity for a key, or `None` when unknown.
    pub fn capacity(&self, key: &str) -> Option<i64> {
        self.state.lock().resources.get(key).map(|r| r.capacity)
    }

    /// Unallocated amount for a key, or `None` when unknown.
    pub fn available(&self, key: &str) -> Option<i64> {
        self.state.lock().resources.get(key).map(|r| r.available())
    }

    /// Allocated amount for a key, or `None` when unknown.
    pub fn allocated_total(&self, key: &str) -> Option<i64> {
        self.state.lock().resources.get(key).map(|r| r.allocated)
    }

    /// Whether a resource pool exists for the key.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().resources.contains_key(key)
    }

    /// Every defined resource key, sorted.
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.state.lock().resources.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Per-key capacity, allocation, and availability totals.
    pub fn totals(&self) -> BTreeMap<ResourceKey, ResourceTotals> {
        self.state
            .lock()
            .resources
            .iter()
            .map(|(key, res)| {
                (
                    key.clone(),
                    ResourceTotals {
                        capacity: res.capacity,
                        allocated: res.allocated,
                        available: res.available(),
                    },
                )
            })
            .collect()
    }

    /// Copy of one live allocation, or `None` when unknown.
    pub fn allocation(&self, id: Uuid) -> Option<AllocationInfo> {
        self.state
            .lock()
            .allocations
            .get(&id)
            .map(AllocationRecord::info)
    }

    /// Copies of every live allocation carrying the owner tag.
    pub fn owner_allocations(&self, owner: &str) -> Vec<AllocationInfo> {
        self.state
            .lock()
            .allocations
            .values()
            .filter(|record| record.owner.as_deref() == Some(owner))
            .map(AllocationRecord::info)
            .collect()
    }

    /// Copies of every live allocation.
    pub fn all_allocations(&self) -> Vec<AllocationInfo> {
        self.state
            .lock()
            .allocations
            .values()
            .map(AllocationRecord::info)
            .collect()
    }

    /// Number of live allocations.
    pub fn allocation_count(&self) -> usize {
        self.state.lock().allocations.len()
    }

    /// Export every pool as flat `(key, capacity, allocated)` entries.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        let mut resources: Vec<ResourceEntry> = state
            .resources
            .iter()
            .map(|(key, res)| ResourceEntry {
                key: key.clone(),
                capacity: res.capacity,
                allocated: res.allocated,
            })
            .collect();
        resources.sort_unstable_by(|a, b| a.key.cmp(&b.key));
        PoolSnapshot { resources }
    }

    /// Replace every pool from a snapshot.
    ///
    /// Refused while any allocation is live; every entry is validated
    /// (`0 <= allocated <= capacity`, non-empty unique keys) before the
    /// existing state is dropped.
    pub fn load_snapshot(&self, snapshot: &PoolSnapshot) -> Result<(), PoolError> {
        let mut resources = HashMap::with_capacity(snapshot.resources.len());
        for entry in &snapshot.resources {
            validate_key(&entry.key)?;
            validate_capacity(&entry.key, entry.capacity)?;
            if entry.allocated < 0 || entry.allocated > entry.capacity {
                return Err(PoolError::Invalid(format!(
                    "snapshot entry `{}` has allocated {} outside 0..={}",
                    entry.key, entry.allocated, entry.capacity
                )));
            }
            let previous = resources.insert(
                entry.key.clone(),
                ResourceState {
                    capacity: entry.capacity,
                    allocated: entry.allocated,
                },
            );
            if previous.is_some() {
                return Err(PoolError::Invalid(format!(
                    "snapshot repeats key `{}`",
                    entry.key
                )));
            }
        }
        let mut state = self.state.lock();
        if !state.allocations.is_empty() {
            return Err(PoolError::LiveAllocations(state.allocations.len()));
        }
        state.resources = resources;
        tracing::info!(pools = state.resources.len(), "snapshot loaded");
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), PoolError> {
    if key.trim().is_empty() {
        return Err(PoolError::Invalid("empty resource key".to_owned()));
    }
    Ok(())
}

fn validate_capacity(key: &str, capacity: i64) -> Result<(), PoolError> {
    if capacity < 0 {
        return Err(PoolError::Invalid(format!(
            "negative capacity {capacity} for `{key}`"
        )));
    }
    Ok(())
}

/// Credit amounts back to their pools. Checks every key before applying so a
/// corrupted record never leaves a half-credited pool.
fn credit(state: &mut PoolState, amounts: &BTreeMap<ResourceKey, i64>) -> Result<(), PoolError> {
    for (key, amount) in amounts {
        let Some(res) = state.resources.get(key) else {
            return Err(PoolError::Corrupted(format!(
                "allocation references missing resource `{key}`"
            )));
        };
        if *amount > res.allocated {
            return Err(PoolError::Corrupted(format!(
                "crediting {amount} of `{key}` exceeds allocated total {}",
                res.allocated
            )));
        }
    }
    for (key, amount) in amounts {
        if let Some(res) = state.resources.get_mut(key) {
            res.allocated -= amount;
        }
    }
    Ok(())
}
