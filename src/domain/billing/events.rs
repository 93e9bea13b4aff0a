//! Billing domain events.
//!
//! Events published as subscriptions and invoices change:
//! - `SubscriptionActivated` - checkout completed for a plan
//! - `SubscriptionStatusChanged` - webhook moved a record to a new status
//! - `SubscriptionCanceled` - record canceled after the remote cancel succeeded
//! - `InvoicePaid` - invoice settled
//! - `InvoicePaymentFailed` - a later cycle failed to charge

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CatalogId, ContactId, CurrencyCode, EventId, InvoiceId, Money, SubscriptionRecordId,
    Timestamp,
};

use super::SubscriptionStatus;

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionActivated
// ════════════════════════════════════════════════════════════════════════════

/// Published when checkout completion creates or activates a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionActivated {
    pub event_id: EventId,
    pub record_id: SubscriptionRecordId,
    pub contact_id: ContactId,
    pub plan_id: CatalogId,
    pub remote_subscription_id: String,
    pub status: SubscriptionStatus,
    pub expires_at: Timestamp,
    pub activated_at: Timestamp,
}

crate::domain_event!(
    SubscriptionActivated,
    event_type = "subscription.activated.v1",
    aggregate_id = record_id,
    aggregate_type = "SubscriptionRecord",
    occurred_at = activated_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionStatusChanged
// ════════════════════════════════════════════════════════════════════════════

/// Published when a webhook moves a record between statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionStatusChanged {
    pub event_id: EventId,
    pub record_id: SubscriptionRecordId,
    pub remote_subscription_id: String,
    pub from: SubscriptionStatus,
    pub to: SubscriptionStatus,
    pub expires_at: Timestamp,
    pub changed_at: Timestamp,
}

crate::domain_event!(
    SubscriptionStatusChanged,
    event_type = "subscription.status_changed.v1",
    aggregate_id = record_id,
    aggregate_type = "SubscriptionRecord",
    occurred_at = changed_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionCanceled
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCanceled {
    pub event_id: EventId,
    pub record_id: SubscriptionRecordId,
    pub contact_id: ContactId,
    pub remote_subscription_id: String,
    pub canceled_at: Timestamp,
}

crate::domain_event!(
    SubscriptionCanceled,
    event_type = "subscription.canceled.v1",
    aggregate_id = record_id,
    aggregate_type = "SubscriptionRecord",
    occurred_at = canceled_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// InvoicePaid
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub contact_id: ContactId,
    pub total: Money,
    pub currency: CurrencyCode,
    pub remote_subscription_id: Option<String>,
    pub paid_at: Timestamp,
}

crate::domain_event!(
    InvoicePaid,
    event_type = "invoice.paid.v1",
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = paid_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// InvoicePaymentFailed
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoicePaymentFailed {
    pub event_id: EventId,
    pub invoice_id: InvoiceId,
    pub contact_id: ContactId,
    pub remote_subscription_id: Option<String>,
    pub failed_at: Timestamp,
}

crate::domain_event!(
    InvoicePaymentFailed,
    event_type = "invoice.payment_failed.v1",
    aggregate_id = invoice_id,
    aggregate_type = "Invoice",
    occurred_at = failed_at,
    event_id = event_id
);
