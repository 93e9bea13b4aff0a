//! Billing handlers.
//!
//! Command and query handlers for the subscription lifecycle:
//!
//! ## Commands
//! - Saving plans, coupons and contacts with processor sync
//! - Checkout payment hand-off and completion
//! - Cancelling subscriptions and deleting contacts
//! - Reconciling processor webhooks
//! - Renewing a plan and removing saved cards
//!
//! ## Queries
//! - Subscriptions of a contact
//! - Saved payment cards

mod cancel_subscription;
mod checkout_finalizer;
mod complete_checkout;
mod delete_contact;
mod list_subscriptions;
mod payment_cards;
mod reconcile_webhook;
mod renew_subscription;
mod save_coupon;
mod save_plan;
mod start_payment;
mod sync_contact;
mod synchronize;

#[cfg(test)]
pub(crate) mod test_support;

pub use checkout_finalizer::{CheckoutPorts, CheckoutReceipt};
pub use synchronize::{synchronize, SyncOutcome};

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use complete_checkout::{CompleteCheckoutCommand, CompleteCheckoutHandler};
pub use delete_contact::{DeleteContactCommand, DeleteContactHandler, DeleteContactResult};
pub use payment_cards::{RemoveCardCommand, RemoveCardHandler};
pub use reconcile_webhook::{
    ReconcileWebhookCommand, ReconcileWebhookHandler, ReconcileWebhookResult,
};
pub use renew_subscription::{RenewSubscriptionCommand, RenewSubscriptionHandler};
pub use save_coupon::{SaveCouponCommand, SaveCouponHandler, SaveCouponResult};
pub use save_plan::{SavePlanCommand, SavePlanHandler, SavePlanResult};
pub use start_payment::{
    PaymentHandoff, StartPaymentCommand, StartPaymentHandler, StartPaymentResult,
};
pub use sync_contact::{SyncContactCommand, SyncContactHandler, SyncContactResult};

// Queries
pub use list_subscriptions::{ListSubscriptionsHandler, ListSubscriptionsQuery, SubscriptionSummary};
pub use payment_cards::{ListCardsHandler, ListCardsQuery, PaymentCard};
