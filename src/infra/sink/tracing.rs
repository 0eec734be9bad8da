//! Event sink that forwards every event to the `tracing` facade.

use crate::core::events::{Event, EventSink};

/// Sink emitting one `tracing` record per event.
///
/// Pool and station events are tagged with their service so subscribers can
/// filter on either stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, event: Event) {
        match &event {
            Event::Pool(pool_event) => {
                tracing::info!(target: "foundry_scheduler::events", event = ?pool_event, "pool event");
            }
            Event::Station(station_event) => {
                tracing::info!(target: "foundry_scheduler::events", event = ?station_event, "station event");
            }
        }
    }
}
