//! EventPublisher port - Interface for publishing domain events.
//!
//! Handlers publish billing events (activations, status changes, paid and
//! failed invoices) without knowing whether they land in a log stream or in
//! a test bus.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{DomainError, DomainEvent, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations deliver at-least-once and propagate their errors.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish several events, in order.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}

/// Wraps `event` in an envelope and publishes it.
///
/// `causation_id` names whatever triggered the event, such as a webhook
/// event id or an estimate id.
pub async fn publish_event<T>(
    publisher: &dyn EventPublisher,
    event: &T,
    causation_id: Option<&str>,
) -> Result<(), DomainError>
where
    T: DomainEvent + Serialize,
{
    let mut envelope = EventEnvelope::from_event(event).map_err(|e| {
        DomainError::new(
            crate::domain::foundation::ErrorCode::InternalError,
            format!("failed to serialize {}: {}", event.event_type(), e),
        )
    })?;
    if let Some(id) = causation_id {
        envelope = envelope.with_causation_id(id);
    }
    publisher.publish(envelope).await
}
