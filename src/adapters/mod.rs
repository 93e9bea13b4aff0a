//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `events` - Event publishers (structured logs, in-memory capture)
//! - `http` - Axum routes
//! - `memory` - In-memory repositories
//! - `postgres` - PostgreSQL repositories
//! - `stripe` - Payment processor client

pub mod events;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use events::{InMemoryEventBus, TracingEventPublisher};
