//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, state machine support, events and
//! error types that form the vocabulary of the billing domain.

mod errors;
mod events;
mod ids;
mod money;
mod percentage;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{CatalogId, ContactId, CouponId, EstimateId, InvoiceId, SubscriptionRecordId};
pub use money::{CurrencyCode, Money};
pub use percentage::Percentage;
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
