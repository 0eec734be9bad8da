//! Per-station production queues and the job state machine.
//!
//! Each registered station runs at most one active job plus a FIFO backlog.
//! A job only enters processing once its cost has been withdrawn through the
//! injected [`Cost`] contract; completion auto-pipelines the next queued job,
//! and a failed withdrawal mid-pipeline halts the station and purges what
//! remains of its queue.
//!
//! The scheduler is a single-threaded cooperative component: every method
//! takes `&mut self`, an external driver calls [`ProductionScheduler::tick`]
//! once per update cycle, and callers that want multi-thread access must
//! serialize commands themselves (for example through one command thread).

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::core::cost::{Cost, Craftable};
use crate::core::error::SchedulerError;
use crate::core::events::{EventSink, StationEvent};
use crate::util::serde::{ControllerToken, StationId};

/// Completion tolerance against floating-point drift in accumulated ticks.
const COMPLETION_EPSILON: f32 = 1e-4;

/// Lifecycle of one queued job. `Finished` is terminal for success and
/// cancellation alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Queued, cost not yet withdrawn.
    Waiting,
    /// Cost withdrawn, advancing with every tick.
    Processing,
    /// Frozen; ticks are skipped but the cost stays withdrawn.
    Paused,
    /// Done, whether completed or cancelled.
    Finished,
}

/// Externally visible station state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationState {
    /// No active job and an empty queue.
    Idle,
    /// Active job advancing with every tick.
    Crafting,
    /// Active job frozen.
    Paused,
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Crafting => "crafting",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

struct ProcessRecord {
    id: Uuid,
    craftable: Arc<dyn Craftable>,
    cost: Option<Arc<dyn Cost>>,
    allocation: Option<Uuid>,
    state: ProcessState,
    duration: f32,
    elapsed: f32,
}

struct StationRecord {
    controller: Option<ControllerToken>,
    state: StationState,
    /// Invariant: `Some` iff `state != Idle`.
    active: Option<Uuid>,
    queue: VecDeque<Uuid>,
}

/// Read-only snapshot of one station.
#[derive(Debug, Clone)]
pub struct StationInfo {
    /// Station state.
    pub state: StationState,
    /// Jobs not yet finished on this station, the active one included.
    pub queued: usize,
    /// Normalized progress of the active job in `0.0..=1.0`.
    pub progress: f32,
    /// Seconds the active job has run.
    pub time_elapsed: f32,
    /// Full duration of the active job.
    pub time_total: f32,
    /// Seconds the active job still needs.
    pub time_remaining: f32,
    /// Craftable of the active job, when one is running.
    pub craftable: Option<Arc<dyn Craftable>>,
}

/// Runs N independent per-station queues against the injected [`Cost`]
/// contract, publishing a [`StationEvent`] for every transition.
pub struct ProductionScheduler {
    stations: HashMap<StationId, StationRecord>,
    processes: HashMap<Uuid, ProcessRecord>,
    sink: Arc<dyn EventSink>,
}

impl ProductionScheduler {
    /// Create a scheduler with no stations, publishing to `sink`.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            stations: HashMap::new(),
            processes: HashMap::new(),
            sink,
        }
    }

    fn publish(&self, event: StationEvent) {
        self.sink.publish(event.into());
    }

    /// Register an idle station. Warns and no-ops when the id is taken.
    pub fn register_station(&mut self, id: StationId, controller: Option<ControllerToken>) {
        if self.stations.contains_key(&id) {
            tracing::warn!(station = %id, "station already registered");
            return;
        }
        tracing::info!(station = %id, "station registered");
        self.stations.insert(
            id,
            StationRecord {
                controller,
                state: StationState::Idle,
                active: None,
                queue: VecDeque::new(),
            },
        );
    }

    /// Remove a station, paying back the active job's cost and discarding the
    /// queue. Queued jobs never held a cost, so they are simply dropped.
    pub fn unregister_station(&mut self, id: &StationId) -> Result<(), SchedulerError> {
        let station = self
            .stations
            .remove(id)
            .ok_or_else(|| SchedulerError::UnknownStation(id.clone()))?;
        let was_idle = station.state == StationState::Idle;
        if let Some(pid) = station.active {
            self.refund_and_finish(id, pid);
        }
        for pid in &station.queue {
            self.processes.remove(pid);
        }
        if !was_idle {
            self.publish(StationEvent::Stopped {
                station: id.clone(),
            });
        }
        tracing::info!(station = %id, "station unregistered");
        Ok(())
    }

    /// Queue a batch of `amount` jobs and start the first one immediately.
    ///
    /// Requires an idle station and a craftable that accepts the batch size.
    /// A missing cost or a refused withdrawal purges every record created by
    /// this call before returning, so a failed start leaves no trace.
    pub fn try_start_crafting(
        &mut self,
        id: &StationId,
        craftable: Arc<dyn Craftable>,
        amount: u32,
    ) -> Result<(), SchedulerError> {
        let station = self
            .stations
            .get(id)
            .ok_or_else(|| SchedulerError::UnknownStation(id.clone()))?;
        if station.state != StationState::Idle {
            return Err(SchedulerError::InvalidState {
                station: id.clone(),
                state: station.state,
                action: "start",
            });
        }
        if amount == 0 || !craftable.validate_requirements(amount) {
            return Err(SchedulerError::RequirementsNotMet(amount));
        }

        let duration = craftable.duration();
        let created: Vec<Uuid> = (0..amount).map(|_| Uuid::new_v4()).collect();
        for pid in &created {
            self.processes.insert(
                *pid,
                ProcessRecord {
                    id: *pid,
                    craftable: Arc::clone(&craftable),
                    cost: None,
                    allocation: None,
                    state: ProcessState::Waiting,
                    duration,
                    elapsed: 0.0,
                },
            );
        }
        if let Some(station) = self.stations.get_mut(id) {
            station.queue.extend(created.iter().copied());
        }

        match self.start_next(id) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                // amount >= 1, so an empty queue here means internal breakage.
                self.purge(id, &created);
                Err(SchedulerError::Corrupted(format!(
                    "queue for `{id}` drained during start"
                )))
            }
            Err(err) => {
                tracing::debug!(station = %id, %err, "start refused; batch purged");
                self.purge(id, &created);
                Err(err)
            }
        }
    }

    /// Pause the active job. The withdrawn cost is kept.
    pub fn try_pause_crafting(&mut self, id: &StationId) -> Result<(), SchedulerError> {
        let pid = {
            let station = self
                .stations
                .get_mut(id)
                .ok_or_else(|| SchedulerError::UnknownStation(id.clone()))?;
            if station.state != StationState::Crafting {
                return Err(SchedulerError::InvalidState {
                    station: id.clone(),
                    state: station.state,
                    action: "pause",
                });
            }
            station.state = StationState::Paused;
            station.active
        };
        let Some(pid) = pid else {
            return Err(SchedulerError::Corrupted(format!(
                "crafting station `{id}` has no active process"
            )));
        };
        if let Some(record) = self.processes.get_mut(&pid) {
            record.state = ProcessState::Paused;
        }
        self.publish(StationEvent::Paused {
            station: id.clone(),
            process: pid,
        });
        Ok(())
    }

    /// Resume a paused job.
    pub fn try_resume_crafting(&mut self, id: &StationId) -> Result<(), SchedulerError> {
        let pid = {
            let station = self
                .stations
                .get_mut(id)
                .ok_or_else(|| SchedulerError::UnknownStation(id.clone()))?;
            if station.state != StationState::Paused {
                return Err(SchedulerError::InvalidState {
                    station: id.clone(),
                    state: station.state,
                    action: "resume",
                });
            }
            station.state = StationState::Crafting;
            station.active
        };
        let Some(pid) = pid else {
            return Err(SchedulerError::Corrupted(format!(
                "paused station `{id}` has no active process"
            )));
        };
        if let Some(record) = self.processes.get_mut(&pid) {
            record.state = ProcessState::Processing;
        }
        self.publish(StationEvent::Resumed {
            station: id.clone(),
            process: pid,
        });
        Ok(())
    }

    /// Cancel the active job and discard the whole queue.
    ///
    /// The active job's cost is paid back; queued jobs never held one. Valid
    /// from any non-idle state.
    pub fn try_stop_crafting(&mut self, id: &StationId) -> Result<(), SchedulerError> {
        let (active, queued) = {
            let station = self
                .stations
                .get_mut(id)
                .ok_or_else(|| SchedulerError::UnknownStation(id.clone()))?;
            if station.state == StationState::Idle {
                return Err(SchedulerError::InvalidState {
                    station: id.clone(),
                    state: station.state,
                    action: "stop",
                });
            }
            let active = station.active.take();
            let queued: Vec<Uuid> = station.queue.drain(..).collect();
            station.state = StationState::Idle;
            (active, queued)
        };
        if let Some(pid) = active {
            self.refund_and_finish(id, pid);
        }
        for pid in queued {
            self.processes.remove(&pid);
        }
        tracing::info!(station = %id, "crafting stopped");
        self.publish(StationEvent::Stopped {
            station: id.clone(),
        });
        Ok(())
    }

    /// Advance every crafting station by `dt` seconds.
    ///
    /// Paused stations are skipped. A job completes once its elapsed time
    /// reaches its duration within a small epsilon; completion publishes
    /// `Completed`, then either pipelines the next queued job (`Started`) or
    /// halts the station (`Stopped`) — a refused withdrawal purges the entire
    /// remaining queue. Leftover `dt` past a completion does not carry into
    /// the next job.
    pub fn tick(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let crafting: Vec<StationId> = self
            .stations
            .iter()
            .filter(|(_, station)| station.state == StationState::Crafting)
            .map(|(id, _)| id.clone())
            .collect();
        for id in crafting {
            self.tick_station(&id, dt);
        }
    }

    fn tick_station(&mut self, id: &StationId, dt: f32) {
        let Some(pid) = self.stations.get(id).and_then(|station| station.active) else {
            return;
        };
        let progress_event = {
            let Some(record) = self.processes.get_mut(&pid) else {
                return;
            };
            record.elapsed += dt;
            if record.elapsed >= record.duration - COMPLETION_EPSILON {
                None
            } else {
                Some(StationEvent::Progress {
                    station: id.clone(),
                    process: pid,
                    progress: progress_of(record.elapsed, record.duration),
                    elapsed: record.elapsed,
                    remaining: (record.duration - record.elapsed).max(0.0),
                })
            }
        };
        if let Some(event) = progress_event {
            self.publish(event);
            return;
        }

        self.processes.remove(&pid);
        if let Some(station) = self.stations.get_mut(id) {
            station.active = None;
        }
        tracing::debug!(station = %id, process = %pid, "job completed");
        self.publish(StationEvent::Completed {
            station: id.clone(),
            process: pid,
        });

        match self.start_next(id) {
            Ok(Some(_)) => {}
            Ok(None) => self.halt(id),
            Err(err) => {
                tracing::warn!(station = %id, %err, "pipeline halted; queue purged");
                let remaining: Vec<Uuid> = self
                    .stations
                    .get(id)
                    .map(|station| station.queue.iter().copied().collect())
                    .unwrap_or_default();
                self.purge(id, &remaining);
                self.halt(id);
            }
        }
    }

    /// Read-only snapshot of a station, or `None` when unknown.
    pub fn station_info(&self, id: &StationId) -> Option<StationInfo> {
        let station = self.stations.get(id)?;
        let queued = station.queue.len() + usize::from(station.active.is_some());
        let info = station
            .active
            .and_then(|pid| self.processes.get(&pid))
            .map_or(
                StationInfo {
                    state: station.state,
                    queued,
                    progress: 0.0,
                    time_elapsed: 0.0,
                    time_total: 0.0,
                    time_remaining: 0.0,
                    craftable: None,
                },
                |record| StationInfo {
                    state: station.state,
                    queued,
                    progress: progress_of(record.elapsed, record.duration),
                    time_elapsed: record.elapsed,
                    time_total: record.duration,
                    time_remaining: (record.duration - record.elapsed).max(0.0),
                    craftable: Some(Arc::clone(&record.craftable)),
                },
            );
        Some(info)
    }

    /// Lifecycle state of a process, or `None` once it is finished and
    /// destroyed (or was never created).
    pub fn process_state(&self, process: Uuid) -> Option<ProcessState> {
        self.processes.get(&process).map(|record| record.state)
    }

    /// Controller token attached at registration, when the station exists.
    pub fn controller(&self, id: &StationId) -> Option<ControllerToken> {
        self.stations.get(id).and_then(|station| station.controller)
    }

    /// Whether a station is registered under the id.
    pub fn contains_station(&self, id: &StationId) -> bool {
        self.stations.contains_key(id)
    }

    /// Every registered station id, in no particular order.
    pub fn stations(&self) -> Vec<StationId> {
        self.stations.keys().cloned().collect()
    }

    /// Withdraw the cost for the queue head and make it the active job.
    ///
    /// The head is only dequeued once its withdrawal succeeds, so on failure
    /// the queue is intact and the caller decides whether to purge it.
    fn start_next(&mut self, id: &StationId) -> Result<Option<Uuid>, SchedulerError> {
        let pid = match self.stations.get(id) {
            Some(station) => match station.queue.front() {
                Some(pid) => *pid,
                None => return Ok(None),
            },
            None => return Err(SchedulerError::UnknownStation(id.clone())),
        };
        let craftable = self
            .processes
            .get(&pid)
            .map(|record| Arc::clone(&record.craftable))
            .ok_or_else(|| {
                SchedulerError::Corrupted(format!("queued process {pid} has no record"))
            })?;
        let cost = craftable.cost().ok_or(SchedulerError::MissingCost)?;
        let allocation = cost
            .withdraw(id)
            .ok_or_else(|| SchedulerError::CostRejected(id.clone()))?;

        if let Some(record) = self.processes.get_mut(&pid) {
            record.cost = Some(cost);
            record.allocation = Some(allocation);
            record.state = ProcessState::Processing;
        }
        if let Some(station) = self.stations.get_mut(id) {
            station.queue.pop_front();
            station.active = Some(pid);
            station.state = StationState::Crafting;
        }
        tracing::debug!(station = %id, process = %pid, "job started");
        self.publish(StationEvent::Started {
            station: id.clone(),
            process: pid,
        });
        Ok(Some(pid))
    }

    /// Drop the given process records and their queue entries.
    fn purge(&mut self, id: &StationId, pids: &[Uuid]) {
        for pid in pids {
            self.processes.remove(pid);
        }
        if let Some(station) = self.stations.get_mut(id) {
            station.queue.retain(|pid| !pids.contains(pid));
        }
    }

    /// Return the station to idle and publish `Stopped`.
    fn halt(&mut self, id: &StationId) {
        if let Some(station) = self.stations.get_mut(id) {
            station.state = StationState::Idle;
            station.active = None;
        }
        self.publish(StationEvent::Stopped {
            station: id.clone(),
        });
    }

    /// Destroy a process record, paying back its cost when one is held.
    fn refund_and_finish(&mut self, id: &StationId, pid: Uuid) {
        let Some(record) = self.processes.remove(&pid) else {
            return;
        };
        if let (Some(cost), Some(allocation)) = (record.cost.as_ref(), record.allocation) {
            if !cost.payback(id, allocation) {
                tracing::warn!(station = %id, process = %record.id, "cost payback refused");
            }
        }
    }
}

fn progress_of(elapsed: f32, duration: f32) -> f32 {
    if duration > 0.0 {
        (elapsed / duration).clamp(0.0, 1.0)
    } else {
        1.0
    }
}
