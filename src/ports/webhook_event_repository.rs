//! WebhookEventRepository port - audit trail and duplicate guard for webhooks.
//!
//! The processor delivers each event at least once. Every delivery we act on
//! is recorded here with its outcome, so a redelivery of the same event id is
//! acknowledged without touching subscription records or invoices again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::DomainError;

/// How a webhook delivery was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Success,
    Ignored,
    Failed,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Success => "success",
            WebhookOutcome::Ignored => "ignored",
            WebhookOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for WebhookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(WebhookOutcome::Success),
            "ignored" => Ok(WebhookOutcome::Ignored),
            "failed" => Ok(WebhookOutcome::Failed),
            other => Err(DomainError::validation(
                "outcome",
                format!("unknown webhook outcome '{}'", other),
            )),
        }
    }
}

/// Record of a handled webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Processor event id (`evt_...`).
    pub event_id: String,
    pub event_type: String,
    pub processed_at: DateTime<Utc>,
    pub outcome: WebhookOutcome,
    /// Why the event was ignored or failed.
    pub reason: Option<String>,
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    fn with_outcome(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        outcome: WebhookOutcome,
        reason: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Utc::now(),
            outcome,
            reason,
            payload,
        }
    }

    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_outcome(event_id, event_type, WebhookOutcome::Success, None, payload)
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_outcome(
            event_id,
            event_type,
            WebhookOutcome::Ignored,
            Some(reason.into()),
            payload,
        )
    }

    pub fn failed(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        error: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self::with_outcome(
            event_id,
            event_type,
            WebhookOutcome::Failed,
            Some(error.into()),
            payload,
        )
    }
}

/// Result of attempting to save a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this event id was seen.
    Inserted,
    /// Another delivery of the same event got there first.
    AlreadyExists,
}

/// Port for storing handled webhook deliveries.
///
/// Implementations key on `event_id` (PRIMARY KEY in PostgreSQL) so
/// concurrent deliveries of the same event resolve to one row.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Inserts the record unless its event id is already stored.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Deletes records processed before `timestamp`, returning how many went.
    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_record_has_no_reason() {
        let record = WebhookEventRecord::success(
            "evt_123",
            "customer.subscription.updated",
            serde_json::json!({"id": "evt_123"}),
        );
        assert_eq!(record.event_id, "evt_123");
        assert_eq!(record.outcome, WebhookOutcome::Success);
        assert!(record.reason.is_none());
    }

    #[test]
    fn ignored_record_keeps_reason() {
        let record = WebhookEventRecord::ignored(
            "evt_456",
            "customer.subscription.updated",
            "untracked subscription",
            serde_json::json!({}),
        );
        assert_eq!(record.outcome, WebhookOutcome::Ignored);
        assert_eq!(record.reason.as_deref(), Some("untracked subscription"));
    }

    #[test]
    fn failed_record_keeps_error() {
        let record = WebhookEventRecord::failed(
            "evt_789",
            "customer.subscription.deleted",
            "database unavailable",
            serde_json::json!({}),
        );
        assert_eq!(record.outcome, WebhookOutcome::Failed);
        assert_eq!(record.reason.as_deref(), Some("database unavailable"));
    }

    #[test]
    fn outcome_round_trips_through_text() {
        for outcome in [WebhookOutcome::Success, WebhookOutcome::Ignored, WebhookOutcome::Failed] {
            assert_eq!(outcome.as_str().parse::<WebhookOutcome>().unwrap(), outcome);
        }
        assert!("retried".parse::<WebhookOutcome>().is_err());
    }
}
