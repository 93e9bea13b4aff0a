//! Data Transfer Objects for billing HTTP endpoints.
//!
//! These types define the JSON/form shapes for requests and responses.
//! They are separate from domain types to allow API evolution.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    CheckoutReceipt, PaymentCard, StartPaymentResult, SubscriptionSummary,
};
use crate::domain::billing::{
    Address, BillingInterval, Coupon, CouponDiscount, CouponDuration, Estimate, IntentType,
    Invoice, InvoiceStatus, Plan, SubscriptionRecord, SubscriptionStatus,
};
use crate::domain::foundation::{
    CatalogId, ContactId, CouponId, CurrencyCode, EstimateId, InvoiceId, SubscriptionRecordId,
    Timestamp,
};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Form posted by the browser once the processor's JS confirmed the intent.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteCheckoutForm {
    pub intentid: String,
    pub intent: IntentType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub contact_id: ContactId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavePlanRequest {
    pub title: String,
    /// Price in minor units.
    pub price: i64,
    /// Falls back to the configured default currency.
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    pub interval: BillingInterval,
    #[serde(default)]
    pub trial_period_days: u32,
    #[serde(default)]
    pub retired: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveCouponRequest {
    pub code: String,
    pub title: String,
    pub discount: CouponDiscount,
    pub duration: CouponDuration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncContactRequest {
    pub email: String,
    pub first_name: String,
    pub surname: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub front_end_user: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Outcome of `POST /checkout/{estimate_id}/payment`.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    /// `awaiting_confirmation`, `redirect_to_address` or `completed`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_type: Option<IntentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptResponse>,
}

impl From<StartPaymentResult> for PaymentResponse {
    fn from(result: StartPaymentResult) -> Self {
        let empty = Self {
            outcome: "",
            client_secret: None,
            intent_type: None,
            intent_id: None,
            publishable_key: None,
            receipt: None,
        };
        match result {
            StartPaymentResult::AwaitingConfirmation(handoff) => Self {
                outcome: "awaiting_confirmation",
                client_secret: Some(handoff.client_secret),
                intent_type: Some(handoff.intent_type),
                intent_id: Some(handoff.intent_id),
                publishable_key: Some(handoff.publishable_key),
                ..empty
            },
            StartPaymentResult::RedirectToAddress(_) => Self {
                outcome: "redirect_to_address",
                ..empty
            },
            StartPaymentResult::Completed(receipt) => Self {
                outcome: "completed",
                receipt: Some(ReceiptResponse::from(receipt)),
                ..empty
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiptResponse {
    pub invoice: InvoiceResponse,
    pub subscriptions: Vec<SubscriptionRecordResponse>,
}

impl From<CheckoutReceipt> for ReceiptResponse {
    fn from(receipt: CheckoutReceipt) -> Self {
        Self {
            invoice: InvoiceResponse::from(receipt.invoice),
            subscriptions: receipt
                .records
                .into_iter()
                .map(SubscriptionRecordResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceResponse {
    pub id: InvoiceId,
    pub status: InvoiceStatus,
    /// Total in minor units.
    pub total: i64,
    pub currency: CurrencyCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            status: invoice.status,
            total: invoice.total.minor_units(),
            currency: invoice.currency,
            remote_subscription_id: invoice.remote_subscription_id,
            paid_at: invoice.paid_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionRecordResponse {
    pub id: SubscriptionRecordId,
    pub plan_id: CatalogId,
    pub status: SubscriptionStatus,
    pub expires_at: Timestamp,
    pub remote_subscription_id: String,
}

impl From<SubscriptionRecord> for SubscriptionRecordResponse {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            id: record.id,
            plan_id: record.plan_id,
            status: record.status,
            expires_at: record.expires_at,
            remote_subscription_id: record.remote_subscription_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionListResponse {
    pub subscriptions: Vec<SubscriptionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardListResponse {
    pub cards: Vec<PaymentCard>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EstimateResponse {
    pub id: EstimateId,
    pub contact_id: ContactId,
    /// Amount payable now, in minor units.
    pub total: i64,
    pub currency: CurrencyCode,
    pub ready_for_payment: bool,
}

impl From<Estimate> for EstimateResponse {
    fn from(estimate: Estimate) -> Self {
        Self {
            id: estimate.id,
            contact_id: estimate.contact_id,
            total: estimate.total().minor_units(),
            ready_for_payment: estimate.check_ready_for_payment().is_ok(),
            currency: estimate.currency,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResponse {
    pub catalog_id: CatalogId,
    pub title: String,
    pub price: i64,
    pub currency: CurrencyCode,
    pub interval: BillingInterval,
    pub trial_period_days: u32,
    pub remote_id: Option<String>,
    pub retired: bool,
}

impl From<Plan> for PlanResponse {
    fn from(plan: Plan) -> Self {
        Self {
            catalog_id: plan.catalog_id,
            title: plan.title,
            price: plan.price.minor_units(),
            currency: plan.currency,
            interval: plan.interval,
            trial_period_days: plan.trial_period_days,
            remote_id: plan.remote_id,
            retired: plan.retired,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponResponse {
    pub id: CouponId,
    pub code: String,
    pub title: String,
    pub discount: CouponDiscount,
    pub duration: CouponDuration,
    pub remote_id: Option<String>,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        Self {
            id: coupon.id,
            code: coupon.code,
            title: coupon.title,
            discount: coupon.discount,
            duration: coupon.duration,
            remote_id: coupon.remote_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactResponse {
    pub id: ContactId,
    pub email: String,
    pub remote_customer_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactDeletedResponse {
    /// Remote subscription ids canceled on the way out.
    pub canceled_subscriptions: Vec<String>,
}

/// Acknowledgement returned to the processor for every accepted delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub event_id: String,
    /// `processed`, `ignored`, `duplicate` or `failed`.
    pub outcome: &'static str,
}

/// Standard error response format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
