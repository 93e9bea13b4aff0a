//! Event publisher adapters.
//!
//! - `TracingEventPublisher` - Emits domain events as structured log records
//! - `InMemoryEventBus` - Captures events for test assertions

mod in_memory;
mod tracing_publisher;

pub use in_memory::InMemoryEventBus;
pub use tracing_publisher::TracingEventPublisher;
