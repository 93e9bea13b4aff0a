//! HTTP adapter for billing endpoints.
//!
//! Exposes checkout, subscription management and webhook reconciliation:
//! - `POST /api/checkout/:estimate_id/payment` - Create the payment or setup intent
//! - `POST /api/checkout/:estimate_id/complete` - Finalize a confirmed checkout
//! - `POST /api/subscriptions/:record_id/cancel` - Cancel a subscription
//! - `GET /api/contacts/:contact_id/subscriptions` - List a contact's subscriptions
//! - `GET|DELETE /api/contacts/:contact_id/cards` - Saved payment cards
//! - `POST /api/contacts/:contact_id/renew/:catalog_id` - Draft a renewal estimate
//! - `PUT /api/plans/:catalog_id`, `POST /api/coupons`, `PUT|DELETE /api/contacts/:contact_id` - Admin
//! - `POST /api/webhooks/stripe` - Reconcile processor events

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{BillingApiError, BillingAppState};
pub use routes::{admin_routes, billing_router, checkout_routes, webhook_routes};
