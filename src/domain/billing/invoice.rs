//! Invoice - the billing record produced by a checkout or a remote cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    ContactId, CurrencyCode, EstimateId, InvoiceId, Money, StateMachine, SubscriptionRecordId,
    Timestamp, ValidationError,
};

use super::{Estimate, LineItem};

/// Payment state of an invoice.
///
/// A failed invoice can be paid again once the processor recovers the
/// charge, and a paid one fails when a later cycle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Failed => "failed",
        }
    }
}

impl StateMachine for InvoiceStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use InvoiceStatus::*;
        matches!(
            (self, target),
            (Unpaid, Paid) | (Unpaid, Failed) | (Paid, Failed) | (Failed, Paid)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use InvoiceStatus::*;
        match self {
            Unpaid => vec![Paid, Failed],
            Paid => vec![Failed],
            Failed => vec![Paid],
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "paid" => Ok(InvoiceStatus::Paid),
            "failed" => Ok(InvoiceStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "invoice_status",
                format!("unknown invoice status '{}'", other),
            )),
        }
    }
}

/// One invoice per remote subscription lifecycle; later cycles only move its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub contact_id: ContactId,
    pub estimate_id: Option<EstimateId>,
    pub currency: CurrencyCode,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub status: InvoiceStatus,
    pub remote_subscription_id: Option<String>,
    pub subscription_record_id: Option<SubscriptionRecordId>,
    pub paid_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Invoice {
    /// Converts a checked-out estimate into an unpaid invoice for the amount
    /// charged at checkout.
    pub fn from_estimate(estimate: &Estimate, now: Timestamp) -> Self {
        Self {
            id: InvoiceId::new(),
            contact_id: estimate.contact_id,
            estimate_id: Some(estimate.id),
            currency: estimate.currency.clone(),
            items: estimate.items.clone(),
            total: estimate.amount_due_now(),
            status: InvoiceStatus::Unpaid,
            remote_subscription_id: estimate.remote_subscription_id.clone(),
            subscription_record_id: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds an unpaid invoice from the items of a remote subscription.
    pub fn from_remote_subscription(
        contact_id: ContactId,
        remote_subscription_id: impl Into<String>,
        currency: CurrencyCode,
        items: Vec<LineItem>,
        now: Timestamp,
    ) -> Self {
        let total = items.iter().map(LineItem::total).sum();
        Self {
            id: InvoiceId::new(),
            contact_id,
            estimate_id: None,
            currency,
            items,
            total,
            status: InvoiceStatus::Unpaid,
            remote_subscription_id: Some(remote_subscription_id.into()),
            subscription_record_id: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    /// Marks the invoice paid. Returns `false` if it already was.
    pub fn mark_paid(&mut self, now: Timestamp) -> Result<bool, ValidationError> {
        if self.status == InvoiceStatus::Paid {
            return Ok(false);
        }
        self.status = self.status.transition_to(InvoiceStatus::Paid)?;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(true)
    }

    /// Marks the invoice failed. Returns `false` if it already was.
    pub fn mark_failed(&mut self, now: Timestamp) -> Result<bool, ValidationError> {
        if self.status == InvoiceStatus::Failed {
            return Ok(false);
        }
        self.status = self.status.transition_to(InvoiceStatus::Failed)?;
        self.updated_at = now;
        Ok(true)
    }

    pub fn link_subscription(&mut self, record_id: SubscriptionRecordId, now: Timestamp) {
        self.subscription_record_id = Some(record_id);
        self.updated_at = now;
    }
}
