//! Billing-specific error types.
//!
//! Errors surfaced by the checkout, cancellation, sync and webhook handlers.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | RemoteUnavailable | 502 |
//! | PaymentSetup | 400 |
//! | PaymentIncomplete | 402 |
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | InvalidState | 409 |
//! | Forbidden | 403 |
//! | InvalidWebhook | 400 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Billing-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingError {
    /// The payment processor could not be reached or refused the call.
    RemoteUnavailable { message: String, retryable: bool },

    /// The processor's response lacked the secret or intent we need.
    PaymentSetup(String),

    /// The submitted intent has not succeeded.
    PaymentIncomplete { intent_id: String, status: String },

    /// A local or remote object is unknown.
    NotFound { resource: String, id: String },

    /// A unique key is already taken.
    Conflict(String),

    /// The state machine refused a transition.
    InvalidState { current: String, attempted: String },

    /// The record is not owned by the requesting contact.
    Forbidden(String),

    /// The webhook body or signature is unusable.
    InvalidWebhook(String),

    /// Input failed validation.
    ValidationFailed { field: String, message: String },

    /// Storage or wiring failure.
    Infrastructure(String),
}

impl BillingError {
    pub fn remote_unavailable(message: impl Into<String>, retryable: bool) -> Self {
        BillingError::RemoteUnavailable {
            message: message.into(),
            retryable,
        }
    }

    pub fn payment_setup(message: impl Into<String>) -> Self {
        BillingError::PaymentSetup(message.into())
    }

    pub fn payment_incomplete(intent_id: impl Into<String>, status: impl Into<String>) -> Self {
        BillingError::PaymentIncomplete {
            intent_id: intent_id.into(),
            status: status.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        BillingError::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        BillingError::Conflict(message.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        BillingError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BillingError::Forbidden(message.into())
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        BillingError::InvalidWebhook(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        BillingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        BillingError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BillingError::RemoteUnavailable { .. } => ErrorCode::RemoteUnavailable,
            BillingError::PaymentSetup(_) => ErrorCode::PaymentSetupFailed,
            BillingError::PaymentIncomplete { .. } => ErrorCode::PaymentIncomplete,
            BillingError::NotFound { resource, .. } => match resource.as_str() {
                "contact" => ErrorCode::ContactNotFound,
                "plan" => ErrorCode::PlanNotFound,
                "coupon" => ErrorCode::CouponNotFound,
                "estimate" => ErrorCode::EstimateNotFound,
                "invoice" => ErrorCode::InvoiceNotFound,
                _ => ErrorCode::SubscriptionNotFound,
            },
            BillingError::Conflict(_) => ErrorCode::SubscriptionExists,
            BillingError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            BillingError::Forbidden(_) => ErrorCode::Forbidden,
            BillingError::InvalidWebhook(_) => ErrorCode::InvalidWebhook,
            BillingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            BillingError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            BillingError::RemoteUnavailable { message, .. } => {
                format!("Payment processor unavailable: {}", message)
            }
            BillingError::PaymentSetup(msg) => format!("Payment could not be set up: {}", msg),
            BillingError::PaymentIncomplete { intent_id, status } => {
                format!("Payment {} has not succeeded (status: {})", intent_id, status)
            }
            BillingError::NotFound { resource, id } => format!("{} not found: {}", resource, id),
            BillingError::Conflict(msg) => format!("Conflict: {}", msg),
            BillingError::InvalidState { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            BillingError::Forbidden(msg) => format!("Forbidden: {}", msg),
            BillingError::InvalidWebhook(msg) => format!("Invalid webhook: {}", msg),
            BillingError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            BillingError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the caller may try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            BillingError::RemoteUnavailable { retryable, .. } => *retryable,
            BillingError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for BillingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for BillingError {}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ContactNotFound => BillingError::not_found("contact", err.message),
            ErrorCode::PlanNotFound => BillingError::not_found("plan", err.message),
            ErrorCode::CouponNotFound => BillingError::not_found("coupon", err.message),
            ErrorCode::EstimateNotFound => BillingError::not_found("estimate", err.message),
            ErrorCode::InvoiceNotFound => BillingError::not_found("invoice", err.message),
            ErrorCode::SubscriptionNotFound => {
                BillingError::not_found("subscription", err.message)
            }
            ErrorCode::SubscriptionExists | ErrorCode::InvoiceExists => {
                BillingError::Conflict(err.message)
            }
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "input".to_string());
                BillingError::validation(field, err.message)
            }
            ErrorCode::InvalidStateTransition => BillingError::invalid_state("current", err.message),
            _ => BillingError::Infrastructure(err.message),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::validation(err.field(), err.to_string())
    }
}
