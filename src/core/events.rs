//! Typed transition events and the sink contract.
//!
//! Every observable transition in the pool and the scheduler is one variant of
//! one enum per service. Publication is fire-and-forget: sinks receive each
//! event at least once per call and delivery order follows publication order.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::util::serde::StationId;

/// Events published by the resource allocation pool.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEvent {
    /// A new resource pool was registered.
    ResourceDefined {
        /// Resource key.
        key: String,
        /// Initial capacity.
        capacity: i64,
    },
    /// An existing pool was resized.
    CapacityChanged {
        /// Resource key.
        key: String,
        /// Capacity before the resize.
        previous: i64,
        /// Capacity after the resize.
        capacity: i64,
    },
    /// A resource pool was removed.
    ResourceRemoved {
        /// Resource key.
        key: String,
    },
    /// An allocation committed.
    AllocationGranted {
        /// Allocation id.
        id: Uuid,
        /// Owner tag, when the request carried one.
        owner: Option<String>,
        /// Exact amounts granted per key.
        granted: BTreeMap<String, i64>,
    },
    /// An all-or-nothing request was refused for lack of capacity.
    AllocationRejected {
        /// Owner tag of the refused request.
        owner: Option<String>,
        /// Per-key amount that was missing.
        shortages: BTreeMap<String, i64>,
    },
    /// An allocation was fully released.
    AllocationReleased {
        /// Allocation id.
        id: Uuid,
    },
    /// Part of an allocation was credited back.
    AllocationPartiallyReleased {
        /// Allocation id.
        id: Uuid,
        /// Amounts credited back per key.
        returned: BTreeMap<String, i64>,
    },
}

/// Events published by the production scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum StationEvent {
    /// A job withdrew its cost and entered processing.
    Started {
        /// Station running the job.
        station: StationId,
        /// Process id.
        process: Uuid,
    },
    /// The active job advanced without completing.
    Progress {
        /// Station running the job.
        station: StationId,
        /// Process id.
        process: Uuid,
        /// Normalized progress in `0.0..=1.0`.
        progress: f32,
        /// Seconds elapsed so far.
        elapsed: f32,
        /// Seconds remaining.
        remaining: f32,
    },
    /// The active job was paused.
    Paused {
        /// Station holding the job.
        station: StationId,
        /// Process id.
        process: Uuid,
    },
    /// A paused job resumed processing.
    Resumed {
        /// Station holding the job.
        station: StationId,
        /// Process id.
        process: Uuid,
    },
    /// The active job reached its full duration.
    Completed {
        /// Station that ran the job.
        station: StationId,
        /// Process id.
        process: Uuid,
    },
    /// The station returned to idle: explicit stop, queue exhaustion, or
    /// natural drain after the last completion.
    Stopped {
        /// Station that went idle.
        station: StationId,
    },
}

/// Top-level event envelope covering both services.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Allocation pool transition.
    Pool(PoolEvent),
    /// Production station transition.
    Station(StationEvent),
}

impl From<PoolEvent> for Event {
    fn from(event: PoolEvent) -> Self {
        Self::Pool(event)
    }
}

impl From<StationEvent> for Event {
    fn from(event: StationEvent) -> Self {
        Self::Station(event)
    }
}

/// Fire-and-forget event sink.
///
/// The pool publishes only after its lock is released, so sinks may query the
/// pool freely; sinks must still never block for long, since publication runs
/// on the caller's thread.
pub trait EventSink: Send + Sync {
    /// Publish one event.
    fn publish(&self, event: Event);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: Event) {}
}
