//! Billing domain - plans, contacts, estimates, invoices and subscription records.
//!
//! # Module Structure
//!
//! - `subscribable` - Contract for records mirrored into the payment processor
//! - `plan` / `coupon` / `contact` - Mirrored catalog and customer records
//! - `estimate` - Draft orders with `ProductKind` line items
//! - `invoice` - Paid/unpaid/failed billing records
//! - `subscription_record` - Local mirror of one remote subscription
//! - `intent` - Payment or setup intent tag for the client hand-off
//! - `status` / `interval` - Subscription status state machine and billing periods
//! - `errors` - `BillingError` surfaced by handlers
//! - `events` - Domain events published on lifecycle changes
//! - `stripe_event` / `webhook_verifier` / `webhook_errors` - Inbound webhook handling

mod contact;
mod coupon;
mod errors;
mod estimate;
mod events;
mod intent;
mod interval;
mod invoice;
mod plan;
mod status;
mod subscribable;
mod stripe_event;
mod subscription_record;
mod webhook_errors;
mod webhook_verifier;

pub use contact::{Address, Contact};
pub use coupon::{Coupon, CouponDiscount, CouponDuration};
pub use errors::BillingError;
pub use estimate::{CheckoutBlocker, Estimate, LineItem, ProductKind};
pub use events::{
    InvoicePaid, InvoicePaymentFailed, SubscriptionActivated, SubscriptionCanceled,
    SubscriptionStatusChanged,
};
pub use intent::IntentType;
pub use interval::BillingInterval;
pub use invoice::{Invoice, InvoiceStatus};
pub use plan::Plan;
pub use status::SubscriptionStatus;
pub use stripe_event::{
    StripeEvent, StripeEventData, StripeEventType, StripePrice, StripeSubscription,
    StripeSubscriptionItem, StripeSubscriptionItems,
};
pub use subscribable::{RemoteObjectKind, Subscribable};
pub use subscription_record::{MirrorOutcome, SubscriptionRecord};
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{parse_event, sign_payload, SignatureHeader, StripeWebhookVerifier};
