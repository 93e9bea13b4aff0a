//! Stripe payment processor adapter.
//!
//! Implements the `RemoteObjectClient` port over Stripe's REST API:
//! - Customers, payment methods, setup and payment intents
//! - Subscriptions, plans and coupons
//!
//! # Security
//!
//! - The secret key is handled via `secrecy::SecretString` and injected at
//!   construction; an empty key fails fast
//!
//! Webhook signature verification lives with the billing domain
//! (`domain::billing::StripeWebhookVerifier`).

mod form;
mod mock_remote_client;
mod stripe_adapter;

pub use mock_remote_client::{MockRemoteObjectClient, RemoteCall};
pub use stripe_adapter::{StripeAdapter, StripeConfig, DEFAULT_API_BASE_URL};
