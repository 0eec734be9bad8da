//! Event-sink backends.

pub mod memory;
pub mod tracing;

pub use memory::InMemoryEventSink;
pub use self::tracing::TracingEventSink;
