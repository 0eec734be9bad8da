//! # Foundry Scheduler
//!
//! A capacity-bounded resource allocation pool and a per-station production
//! scheduler, packaged as one embeddable admission-control + job-scheduling
//! engine.
//!
//! ## Core Problem Solved
//!
//! Production pipelines — crafting queues, build systems, batch processors —
//! keep running into the same two problems:
//!
//! - **Finite shared resources**: many stations compete for the same bounded
//!   stock, and a reservation must either commit across every key it touches
//!   or not at all
//! - **Queue discipline under scarcity**: a station with a backlog has to
//!   withdraw resources for each job before running it, and decide what
//!   happens to the rest of the queue when the stock runs dry
//!
//! ## Key Features
//!
//! - **Atomic multi-key reservation**: all-or-nothing requests abort with
//!   exact per-key shortages and zero mutation; best-effort requests grant
//!   each key independently up to availability
//! - **Thread-safe pool**: one coarse lock serializes every mutation, and
//!   event publication is deferred past lock release so subscribers can never
//!   deadlock the pool
//! - **Per-station FIFO queues**: one active job per station plus a backlog,
//!   with pause/resume/cancel and cost payback on cancellation
//! - **Auto-pipelining**: completing a job immediately withdraws the cost of
//!   the next queued one; a refused withdrawal halts the station and purges
//!   its queue
//! - **Substitutable cost backend**: the scheduler only speaks the [`Cost`]
//!   contract, so tests and embedders can swap the pool for anything
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use foundry_scheduler::core::{
//!     AllocationRequest, ProductionScheduler, Recipe, RecipeCost,
//!     ResourceAllocationPool,
//! };
//! use foundry_scheduler::infra::TracingEventSink;
//!
//! let sink = Arc::new(TracingEventSink);
//! let pool = Arc::new(ResourceAllocationPool::new(sink.clone()));
//! pool.define_resource("wood", 100)?;
//!
//! let mut scheduler = ProductionScheduler::new(sink);
//! scheduler.register_station("sawmill".into(), None);
//!
//! let plank = Arc::new(
//!     Recipe::new("plank", 2.5)
//!         .with_cost(Arc::new(RecipeCost::new(pool.clone(), [("wood".into(), 10)].into()))),
//! );
//! scheduler.try_start_crafting(&"sawmill".into(), plank, 3)?;
//!
//! // Host loop drives time explicitly.
//! scheduler.tick(0.5);
//! ```
//!
//! For complete examples, see the integration tests under `tests/`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Allocation pool, production scheduler, and the contracts between them.
pub mod core;
/// Configuration models for allocation pools.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Infrastructure adapters for event delivery.
pub mod infra;
/// Shared utilities.
pub mod util;

pub use crate::core::{Cost, Craftable, EventSink, ProductionScheduler, ResourceAllocationPool};
