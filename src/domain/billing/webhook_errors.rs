//! Webhook error types.
//!
//! Signature and parse failures are the sender's fault and are answered with
//! 400. Storage failures are ours, so the processor should redeliver.

use thiserror::Error;

use crate::domain::foundation::DomainError;

use super::BillingError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Invalid signature")]
    InvalidSignature,

    /// Event is older than the five minute window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Event claims to come from the future, beyond clock skew.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Payload or signature header could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Event acknowledged without action.
    #[error("Event ignored: {0}")]
    Ignored(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// True when the sender is at fault and redelivery cannot help.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
                | WebhookError::ParseError(_)
        )
    }

    /// True for storage faults, as opposed to problems with the event itself.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Database(_))
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}

impl From<WebhookError> for BillingError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Database(message) => BillingError::infrastructure(message),
            other => BillingError::invalid_webhook(other.to_string()),
        }
    }
}
