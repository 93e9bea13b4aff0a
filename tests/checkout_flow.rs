//! Integration tests for the checkout and reconciliation flow.
//!
//! Drives the application handlers end to end against the in-memory
//! repositories and the mock processor:
//! 1. Save a plan and a front-end contact (both mirrored remotely)
//! 2. Draft a renewal estimate, start payment, confirm the intent
//! 3. Complete checkout and inspect the receipt
//! 4. Feed processor webhooks and check the mirrored state
//!
//! Run with: cargo test --test checkout_flow

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use subscription_billing::adapters::events::InMemoryEventBus;
use subscription_billing::adapters::memory::{
    InMemoryContactRepository, InMemoryEstimateRepository,
    InMemoryInvoiceRepository, InMemoryPlanRepository, InMemorySubscriptionRecordRepository,
    InMemoryWebhookEventRepository,
};
use subscription_billing::adapters::stripe::MockRemoteObjectClient;
use subscription_billing::application::handlers::billing::{
    CheckoutPorts, CheckoutReceipt, CompleteCheckoutCommand, CompleteCheckoutHandler,
    ListSubscriptionsHandler, ListSubscriptionsQuery, ReconcileWebhookCommand,
    ReconcileWebhookHandler, ReconcileWebhookResult, RenewSubscriptionCommand,
    RenewSubscriptionHandler, SavePlanCommand, SavePlanHandler, StartPaymentCommand,
    StartPaymentHandler, StartPaymentResult, SyncContactCommand, SyncContactHandler,
};
use subscription_billing::domain::billing::{
    Address, BillingError, BillingInterval, Contact, IntentType, InvoiceStatus, Plan, RemoteObjectKind,
    SubscriptionStatus,
};
use subscription_billing::domain::foundation::{CatalogId, CurrencyCode, Money};
use subscription_billing::ports::{InvoiceRepository, RemoteObjectClient, SubscriptionRecordRepository};

// ════════════════════════════════════════════════════════════════════════════════
// Test Infrastructure
// ════════════════════════════════════════════════════════════════════════════════

struct Billing {
    remote: MockRemoteObjectClient,
    plans: Arc<InMemoryPlanRepository>,
    contacts: Arc<InMemoryContactRepository>,
    estimates: Arc<InMemoryEstimateRepository>,
    invoices: Arc<InMemoryInvoiceRepository>,
    records: Arc<InMemorySubscriptionRecordRepository>,
    webhook_events: Arc<InMemoryWebhookEventRepository>,
    events: Arc<InMemoryEventBus>,
}

impl Billing {
    fn new() -> Self {
        Self {
            remote: MockRemoteObjectClient::new(),
            plans: Arc::new(InMemoryPlanRepository::new()),
            contacts: Arc::new(InMemoryContactRepository::new()),
            estimates: Arc::new(InMemoryEstimateRepository::new()),
            invoices: Arc::new(InMemoryInvoiceRepository::new()),
            records: Arc::new(InMemorySubscriptionRecordRepository::new()),
            webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
            events: Arc::new(InMemoryEventBus::new()),
        }
    }

    fn remote_client(&self) -> Arc<dyn RemoteObjectClient> {
        Arc::new(self.remote.clone())
    }

    fn ports(&self) -> CheckoutPorts {
        CheckoutPorts {
            remote: self.remote_client(),
            plans: self.plans.clone(),
            contacts: self.contacts.clone(),
            estimates: self.estimates.clone(),
            invoices: self.invoices.clone(),
            records: self.records.clone(),
            event_publisher: self.events.clone(),
        }
    }

    fn reconciler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(
            None,
            self.webhook_events.clone(),
            self.records.clone(),
            self.invoices.clone(),
            self.plans.clone(),
            self.events.clone(),
        )
    }

    async fn save_plan(&self, catalog_id: &str, price: i64, trial_days: u32) -> Plan {
        let result = SavePlanHandler::new(self.plans.clone(), self.remote_client())
            .handle(SavePlanCommand {
                catalog_id: CatalogId::new(catalog_id).unwrap(),
                title: "Gold membership".to_string(),
                price: Money::from_minor(price),
                currency: CurrencyCode::new("usd").unwrap(),
                interval: BillingInterval::Month,
                trial_period_days: trial_days,
                retired: false,
            })
            .await
            .unwrap();
        result.plan
    }

    async fn save_contact(&self) -> Contact {
        let contact = Contact::new("grace@example.com", "Grace", "Hopper")
            .unwrap()
            .with_address(Address {
                line1: "1 Compiler Way".to_string(),
                line2: None,
                city: "Arlington".to_string(),
                state: Some("VA".to_string()),
                postal_code: "22201".to_string(),
                country: "US".to_string(),
            })
            .as_front_end_user();
        let result = SyncContactHandler::new(self.contacts.clone(), self.remote_client())
            .handle(SyncContactCommand { contact })
            .await
            .unwrap();
        result.contact
    }

    /// Plan, contact and a completed checkout for one month of `catalog_id`.
    async fn subscribe(&self, catalog_id: &str, trial_days: u32) -> CheckoutReceipt {
        self.save_plan(catalog_id, 1500, trial_days).await;
        let contact = self.save_contact().await;

        let estimate = RenewSubscriptionHandler::new(
            self.contacts.clone(),
            self.plans.clone(),
            self.estimates.clone(),
        )
        .handle(RenewSubscriptionCommand {
            contact_id: contact.id,
            catalog_id: CatalogId::new(catalog_id).unwrap(),
        })
        .await
        .unwrap();

        // A trial owes nothing now and completes without a hand-off.
        if trial_days > 0 {
            self.remote.set_subscription_status("trialing");
        }
        let handoff = match StartPaymentHandler::new(self.ports(), "pk_test_flow")
            .handle(StartPaymentCommand {
                estimate_id: estimate.id,
            })
            .await
            .unwrap()
        {
            StartPaymentResult::AwaitingConfirmation(handoff) => handoff,
            StartPaymentResult::Completed(receipt) if trial_days > 0 => return receipt,
            other => panic!("expected a payment hand-off, got {:?}", other),
        };
        self.remote.succeed_intent(RemoteObjectKind::PaymentIntent, &handoff.intent_id);

        CompleteCheckoutHandler::new(self.ports())
            .handle(CompleteCheckoutCommand {
                estimate_id: estimate.id,
                intent_id: handoff.intent_id,
                intent_type: handoff.intent_type,
            })
            .await
            .unwrap()
    }
}

fn subscription_event(
    event_id: &str,
    event_type: &str,
    subscription_id: &str,
    status: &str,
    previous: Option<&str>,
) -> ReconcileWebhookCommand {
    let mut data = json!({
        "object": {
            "id": subscription_id,
            "object": "subscription",
            "status": status,
            "current_period_end": 1_893_456_000,
            "items": { "data": [ { "price": { "id": "gold" }, "quantity": 1 } ] }
        }
    });
    if let Some(previous) = previous {
        data["previous_attributes"] = json!({ "status": previous });
    }
    let body = json!({ "id": event_id, "type": event_type, "data": data });
    ReconcileWebhookCommand {
        payload: serde_json::to_vec(&body).unwrap(),
        signature: None,
    }
}

fn updated(event_id: &str, subscription_id: &str, status: &str, previous: Option<&str>) -> ReconcileWebhookCommand {
    subscription_event(event_id, "customer.subscription.updated", subscription_id, status, previous)
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn saved_plan_and_contact_are_mirrored_remotely() {
    let billing = Billing::new();

    let plan = billing.save_plan("gold", 1500, 0).await;
    let contact = billing.save_contact().await;

    assert_eq!(plan.remote_id.as_deref(), Some("gold"));
    assert!(billing.remote.object(RemoteObjectKind::Plan, "gold").is_some());
    let customer_id = contact.remote_customer_id.clone().unwrap();
    let customer = billing
        .remote
        .object(RemoteObjectKind::Customer, &customer_id)
        .unwrap();
    assert_eq!(customer["email"], "grace@example.com");
}

#[tokio::test]
async fn paid_checkout_produces_active_record_and_paid_invoice() {
    let billing = Billing::new();

    let receipt = billing.subscribe("gold", 0).await;

    assert_eq!(receipt.invoice.status, InvoiceStatus::Paid);
    assert_eq!(receipt.records.len(), 1);
    let record = &receipt.records[0];
    assert_eq!(record.status, SubscriptionStatus::Active);
    assert_eq!(receipt.invoice.subscription_record_id, Some(record.id));
    assert_eq!(billing.records.count().await, 1);
    assert_eq!(billing.invoices.count().await, 1);
    assert!(billing.events.has_event("subscription.activated.v1"));

    let listed = ListSubscriptionsHandler::new(billing.contacts.clone(), billing.records.clone())
        .handle(ListSubscriptionsQuery {
            contact_id: record.contact_id,
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].has_access);
    assert!(!listed[0].is_expired);
}

#[tokio::test]
async fn trial_checkout_completes_without_payment() {
    let billing = Billing::new();

    let receipt = billing.subscribe("gold", 14).await;

    assert_eq!(receipt.records.len(), 1);
    let record = &receipt.records[0];
    assert_eq!(record.status, SubscriptionStatus::Trialing);
    assert!(receipt.invoice.total.is_zero());
    assert!(billing
        .remote
        .object(RemoteObjectKind::Subscription, &record.remote_subscription_id)
        .is_some());
    assert!(!billing.remote.was_called("retrieve"));
}

#[tokio::test]
async fn lapsed_trial_cannot_jump_to_past_due() {
    let billing = Billing::new();
    let receipt = billing.subscribe("gold", 14).await;
    let record = receipt.records[0].clone();

    let result = billing
        .reconciler()
        .handle(updated("evt_1", &record.remote_subscription_id, "past_due", Some("trialing")))
        .await
        .unwrap();

    assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
    let stored = billing
        .records
        .find_by_remote_subscription_id(&record.remote_subscription_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Trialing);
    assert_eq!(stored.expires_at, record.expires_at);
}

#[tokio::test]
async fn completing_twice_is_rejected_after_the_estimate_is_consumed() {
    let billing = Billing::new();
    let receipt = billing.subscribe("gold", 0).await;

    let result = CompleteCheckoutHandler::new(billing.ports())
        .handle(CompleteCheckoutCommand {
            estimate_id: receipt.invoice.estimate_id.unwrap(),
            intent_id: "pi_whatever".to_string(),
            intent_type: IntentType::Payment,
        })
        .await;

    assert!(matches!(result, Err(BillingError::NotFound { .. })));
    assert_eq!(billing.records.count().await, 1);
}

// ════════════════════════════════════════════════════════════════════════════════
// Reconciliation
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn failed_renewal_marks_invoice_failed_and_record_past_due() {
    let billing = Billing::new();
    let receipt = billing.subscribe("gold", 0).await;
    let sub_id = receipt.records[0].remote_subscription_id.clone();

    let result = billing
        .reconciler()
        .handle(updated("evt_past_due", &sub_id, "past_due", Some("active")))
        .await
        .unwrap();

    assert_eq!(
        result,
        ReconcileWebhookResult::Processed {
            event_id: "evt_past_due".into()
        }
    );
    let record = billing
        .records
        .find_by_remote_subscription_id(&sub_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::PastDue);
    assert_eq!(record.expires_at.as_unix_secs(), 1_893_456_000);
    let invoice = billing
        .invoices
        .find_by_remote_subscription_id(&sub_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Failed);
    assert!(billing.events.has_event("invoice.payment_failed.v1"));
}

#[tokio::test]
async fn deleted_subscription_is_terminal() {
    let billing = Billing::new();
    let receipt = billing.subscribe("gold", 0).await;
    let sub_id = receipt.records[0].remote_subscription_id.clone();
    let reconciler = billing.reconciler();

    reconciler
        .handle(subscription_event(
            "evt_deleted",
            "customer.subscription.deleted",
            &sub_id,
            "canceled",
            Some("active"),
        ))
        .await
        .unwrap();
    let late = reconciler
        .handle(updated("evt_late", &sub_id, "active", Some("past_due")))
        .await
        .unwrap();

    assert!(matches!(late, ReconcileWebhookResult::Ignored { .. }));
    let record = billing
        .records
        .find_by_remote_subscription_id(&sub_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, SubscriptionStatus::Canceled);
}

#[tokio::test]
async fn webhook_for_unknown_subscription_is_acknowledged() {
    let billing = Billing::new();
    billing.subscribe("gold", 0).await;

    let result = billing
        .reconciler()
        .handle(updated("evt_other", "sub_not_ours", "active", Some("incomplete")))
        .await
        .unwrap();

    assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
    assert_eq!(billing.invoices.count().await, 1);
}

// ════════════════════════════════════════════════════════════════════════════════
// Redelivery
// ════════════════════════════════════════════════════════════════════════════════

fn status_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("active"),
        Just("past_due"),
        Just("unpaid"),
        Just("incomplete"),
        Just("trialing"),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Replaying a delivery any number of times lands in the same state as
    /// delivering it once.
    #[test]
    fn redelivery_matches_single_delivery(
        status in status_name(),
        previous in proptest::option::of(status_name()),
        repeats in 1usize..5,
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let once = Billing::new();
            let receipt = once.subscribe("gold", 0).await;
            let once_sub = receipt.records[0].remote_subscription_id.clone();
            once.reconciler()
                .handle(updated("evt_1", &once_sub, status, previous))
                .await
                .unwrap();

            let many = Billing::new();
            let receipt = many.subscribe("gold", 0).await;
            let many_sub = receipt.records[0].remote_subscription_id.clone();
            let reconciler = many.reconciler();
            for _ in 0..repeats {
                reconciler
                    .handle(updated("evt_1", &many_sub, status, previous))
                    .await
                    .unwrap();
            }

            let once_record = once.records.find_by_remote_subscription_id(&once_sub).await.unwrap().unwrap();
            let many_record = many.records.find_by_remote_subscription_id(&many_sub).await.unwrap().unwrap();
            prop_assert_eq!(once_record.status, many_record.status);
            prop_assert_eq!(once_record.expires_at, many_record.expires_at);

            let once_invoice = once.invoices.find_by_remote_subscription_id(&once_sub).await.unwrap().unwrap();
            let many_invoice = many.invoices.find_by_remote_subscription_id(&many_sub).await.unwrap().unwrap();
            prop_assert_eq!(once_invoice.status, many_invoice.status);

            prop_assert_eq!(many.records.count().await, 1);
            prop_assert_eq!(many.invoices.count().await, 1);
            prop_assert_eq!(many.webhook_events.count().await, 1);
            Ok(())
        })?;
    }
}
