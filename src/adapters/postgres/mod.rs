//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresPlanRepository` / `PostgresCouponRepository` - Mirrored catalog
//! - `PostgresContactRepository` / `PostgresEstimateRepository` - Customers and draft orders
//! - `PostgresSubscriptionRecordRepository` / `PostgresInvoiceRepository` - Billing ledger
//! - `PostgresWebhookEventRepository` - Handled webhook deliveries
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!` at startup.

mod catalog;
mod contacts;
mod ledger;
mod webhook_events;

pub use catalog::{PostgresCouponRepository, PostgresPlanRepository};
pub use contacts::{PostgresContactRepository, PostgresEstimateRepository};
pub use ledger::{PostgresInvoiceRepository, PostgresSubscriptionRecordRepository};
pub use webhook_events::PostgresWebhookEventRepository;

use crate::domain::foundation::DomainError;

/// Maps an unreadable column value to a storage error.
fn row_error<E: std::fmt::Display>(column: &'static str) -> impl Fn(E) -> DomainError {
    move |e| DomainError::database(format!("Invalid {} in stored row: {}", column, e))
}
