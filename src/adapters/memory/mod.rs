//! In-memory repositories.
//!
//! `tokio::sync::RwLock<HashMap>` stores used by handler tests, the
//! integration tests and local runs without a database.

mod catalog;
mod contacts;
mod ledger;
mod webhook_events;

pub use catalog::{InMemoryCouponRepository, InMemoryPlanRepository};
pub use contacts::{InMemoryContactRepository, InMemoryEstimateRepository};
pub use ledger::{InMemoryInvoiceRepository, InMemorySubscriptionRecordRepository};
pub use webhook_events::InMemoryWebhookEventRepository;
