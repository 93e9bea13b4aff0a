//! Shared fixtures for billing handler tests.

use std::sync::Arc;

use serde_json::json;

use crate::adapters::events::InMemoryEventBus;
use crate::adapters::memory::{
    InMemoryContactRepository, InMemoryCouponRepository, InMemoryEstimateRepository,
    InMemoryInvoiceRepository, InMemoryPlanRepository, InMemorySubscriptionRecordRepository,
    InMemoryWebhookEventRepository,
};
use crate::adapters::stripe::MockRemoteObjectClient;
use crate::domain::billing::{Address, BillingInterval, Contact, Estimate, Plan, RemoteObjectKind};
use crate::domain::foundation::{CatalogId, CurrencyCode, Money};
use crate::ports::{ContactRepository, EstimateRepository, PlanRepository, RemoteObjectClient};

pub struct Fixture {
    pub remote: MockRemoteObjectClient,
    pub plans: Arc<InMemoryPlanRepository>,
    pub coupons: Arc<InMemoryCouponRepository>,
    pub contacts: Arc<InMemoryContactRepository>,
    pub estimates: Arc<InMemoryEstimateRepository>,
    pub invoices: Arc<InMemoryInvoiceRepository>,
    pub records: Arc<InMemorySubscriptionRecordRepository>,
    pub webhook_events: Arc<InMemoryWebhookEventRepository>,
    pub events: Arc<InMemoryEventBus>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            remote: MockRemoteObjectClient::new(),
            plans: Arc::new(InMemoryPlanRepository::new()),
            coupons: Arc::new(InMemoryCouponRepository::new()),
            contacts: Arc::new(InMemoryContactRepository::new()),
            estimates: Arc::new(InMemoryEstimateRepository::new()),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            records: Arc::new(InMemorySubscriptionRecordRepository::new()),
            webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
            events: Arc::new(InMemoryEventBus::new()),
        }
    }

    pub fn remote_client(&self) -> Arc<dyn RemoteObjectClient> {
        Arc::new(self.remote.clone())
    }

    /// A monthly plan already mirrored in the processor.
    pub async fn synced_plan(&self, catalog_id: &str, price: i64, trial_days: u32) -> Plan {
        let mut plan = Plan::new(
            CatalogId::new(catalog_id).unwrap(),
            catalog_id.to_uppercase(),
            Money::from_minor(price),
            CurrencyCode::new("usd").unwrap(),
            BillingInterval::Month,
            trial_days,
        )
        .unwrap();
        plan.remote_id = Some(catalog_id.to_string());
        self.remote.insert_object(
            RemoteObjectKind::Plan,
            json!({ "id": catalog_id, "amount": price, "interval": "month" }),
        );
        self.plans.save(&plan).await.unwrap();
        plan
    }

    pub async fn contact(&self) -> Contact {
        let contact = Contact::new("ada@example.com", "Ada", "Lovelace")
            .unwrap()
            .with_address(address());
        self.contacts.save(&contact).await.unwrap();
        contact
    }

    /// A saved single-plan estimate ready for payment.
    pub async fn plan_estimate(&self, contact: &Contact, plan: &Plan) -> Estimate {
        let estimate = Estimate::for_renewal(contact, plan);
        self.estimates.save(&estimate).await.unwrap();
        estimate
    }
}

pub fn address() -> Address {
    Address {
        line1: "12 Analytical Row".to_string(),
        line2: None,
        city: "London".to_string(),
        state: None,
        postal_code: "N1 9GU".to_string(),
        country: "GB".to_string(),
    }
}
