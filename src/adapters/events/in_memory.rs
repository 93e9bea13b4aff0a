//! In-memory event bus for tests.
//!
//! Captures every published envelope so tests can assert on billing events
//! (`subscription.activated.v1`, `invoice.paid.v1`, ...). Not meant for
//! production wiring; `TracingEventPublisher` fills that role.

use async_trait::async_trait;
use std::sync::{RwLock, RwLockReadGuard};

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::EventPublisher;

/// In-memory event bus for testing.
///
/// # Example
///
/// ```ignore
/// let bus = Arc::new(InMemoryEventBus::new());
/// handler.handle(cmd).await?;
/// assert!(bus.has_event("invoice.paid.v1"));
/// ```
#[derive(Default)]
pub struct InMemoryEventBus {
    published: RwLock<Vec<EventEnvelope>>,
    /// When set, every publish fails with this message.
    failure: RwLock<Option<String>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<EventEnvelope>> {
        self.published.read().unwrap_or_else(|p| p.into_inner())
    }

    // === Test Helpers ===

    pub fn published_events(&self) -> Vec<EventEnvelope> {
        self.read().clone()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.read()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    pub fn events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventEnvelope> {
        self.read()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    pub fn event_count(&self) -> usize {
        self.read().len()
    }

    pub fn has_event(&self, event_type: &str) -> bool {
        self.read().iter().any(|e| e.event_type == event_type)
    }

    /// Clears all published events (for test isolation).
    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }

    /// Makes every later publish fail.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().unwrap_or_else(|p| p.into_inner()) = Some(message.into());
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError> {
        if let Some(message) = self.failure.read().unwrap_or_else(|p| p.into_inner()).clone() {
            return Err(DomainError::new(ErrorCode::InternalError, message));
        }
        self.published
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(event);
        Ok(())
    }

    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }
}
