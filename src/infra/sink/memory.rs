//! In-memory event sink with a bounded buffer.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::core::events::{Event, EventSink};

/// Bounded in-memory sink for testing and dev.
///
/// Keeps the newest `max_events` events; older ones are dropped from the
/// front.
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<Event>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink retaining at most `max_events` events.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Snapshot of the stored events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().iter().cloned().collect()
    }

    /// Drain and return the stored events, oldest first.
    pub fn take(&self) -> Vec<Event> {
        self.events.lock().drain(..).collect()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no events are stored.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for InMemoryEventSink {
    fn publish(&self, event: Event) {
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}
