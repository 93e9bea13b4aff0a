//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the billing domain and the outside world. Adapters implement these ports.
//!
//! ## Payment Processor
//!
//! - `RemoteObjectClient` - Create-or-update, retrieve, delete and list
//!   processor objects
//!
//! ## Repositories
//!
//! - `PlanRepository`, `CouponRepository`, `ContactRepository`
//! - `EstimateRepository`, `InvoiceRepository`
//! - `SubscriptionRecordRepository` - unique per remote subscription id
//!
//! ## Events and Webhooks
//!
//! - `EventPublisher` - Port for publishing domain events
//! - `WebhookEventRepository` - Webhook audit trail and duplicate guard

mod contact_repository;
mod coupon_repository;
mod estimate_repository;
mod event_publisher;
mod invoice_repository;
mod plan_repository;
mod remote_object_client;
mod subscription_record_repository;
mod webhook_event_repository;

pub use contact_repository::ContactRepository;
pub use coupon_repository::CouponRepository;
pub use estimate_repository::EstimateRepository;
pub use event_publisher::{publish_event, EventPublisher};
pub use invoice_repository::InvoiceRepository;
pub use plan_repository::PlanRepository;
pub use remote_object_client::{RemoteError, RemoteErrorCode, RemoteObject, RemoteObjectClient};
pub use subscription_record_repository::SubscriptionRecordRepository;
pub use webhook_event_repository::{
    SaveResult, WebhookEventRecord, WebhookEventRepository, WebhookOutcome,
};

pub use crate::domain::billing::{RemoteObjectKind, Subscribable};
