//! Infrastructure adapters for event delivery.

pub mod sink;

pub use sink::InMemoryEventSink;
pub use sink::TracingEventSink;
