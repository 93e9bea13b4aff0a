//! ReconcileWebhookHandler - Mirrors processor subscription events locally.
//!
//! Flow:
//! 1. Verify the signature (when a signing secret is configured) and parse
//! 2. Skip event ids already recorded
//! 3. Copy the remote status and period end onto the tracked record
//! 4. Find or synthesize the subscription's invoice and mark it paid/failed
//!    from the previous status carried by the event
//! 5. Record the outcome for auditing
//!
//! Records are never created here; checkout owns that. Every parsed event is
//! acknowledged: failures are recorded and never left for redelivery.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::billing::{
    BillingError, Invoice, InvoicePaid, InvoicePaymentFailed, LineItem, MirrorOutcome, StripeEvent,
    StripeEventType, StripeSubscription, StripeWebhookVerifier, SubscriptionCanceled,
    SubscriptionRecord, SubscriptionStatus, SubscriptionStatusChanged, WebhookError,
};
use crate::domain::foundation::{CatalogId, EventId, Timestamp};
use crate::ports::{
    publish_event, EventPublisher, InvoiceRepository, PlanRepository, SaveResult,
    SubscriptionRecordRepository, WebhookEventRecord, WebhookEventRepository,
};

/// Raw delivery as received on the webhook endpoint.
#[derive(Debug, Clone)]
pub struct ReconcileWebhookCommand {
    pub payload: Vec<u8>,
    /// Value of the `Stripe-Signature` header.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWebhookResult {
    Processed { event_id: String },
    /// Acknowledged and dropped: wrong event type, untracked subscription,
    /// canceled record.
    Ignored { event_id: String, reason: String },
    AlreadyProcessed { event_id: String },
    /// Recorded as failed. Still acknowledged; the processor does not retry.
    Failed { event_id: String, reason: String },
}

/// What the event means for the subscription's invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvoiceAction {
    MarkFailed,
    MarkPaid,
    Nothing,
}

/// Invoice effect of a status move. Without a previous status there is none.
fn invoice_action(
    previous: Option<SubscriptionStatus>,
    current: SubscriptionStatus,
    invoice_is_fresh: bool,
) -> InvoiceAction {
    use SubscriptionStatus::*;
    match previous {
        Some(Active) if current == PastDue => InvoiceAction::MarkFailed,
        Some(prev) if prev != Active && current == Active && invoice_is_fresh => {
            InvoiceAction::MarkPaid
        }
        _ => InvoiceAction::Nothing,
    }
}

pub struct ReconcileWebhookHandler {
    verifier: Option<StripeWebhookVerifier>,
    webhook_events: Arc<dyn WebhookEventRepository>,
    records: Arc<dyn SubscriptionRecordRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    plans: Arc<dyn PlanRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl ReconcileWebhookHandler {
    /// `verifier` is `None` when no signing secret is configured; payloads
    /// are then parsed without a signature check.
    pub fn new(
        verifier: Option<StripeWebhookVerifier>,
        webhook_events: Arc<dyn WebhookEventRepository>,
        records: Arc<dyn SubscriptionRecordRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        plans: Arc<dyn PlanRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            verifier,
            webhook_events,
            records,
            invoices,
            plans,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReconcileWebhookCommand,
    ) -> Result<ReconcileWebhookResult, BillingError> {
        // 1. Verify and parse
        let event = self.parse(&cmd)?;
        let event_id = event.id.clone();

        // 2. Duplicate delivery
        match self.webhook_events.find_by_event_id(&event_id).await {
            Ok(Some(_)) => {
                tracing::debug!(event_id = %event_id, "webhook already processed");
                return Ok(ReconcileWebhookResult::AlreadyProcessed { event_id });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(event_id = %event_id, error = %e, "webhook audit lookup failed");
                return Ok(ReconcileWebhookResult::Failed {
                    event_id,
                    reason: e.to_string(),
                });
            }
        }

        // 3. Reconcile
        let payload: Value = serde_json::from_slice(&cmd.payload).unwrap_or(Value::Null);
        let (audit, result) = match self.reconcile(&event).await {
            Ok(()) => (
                WebhookEventRecord::success(&event_id, &event.event_type, payload),
                ReconcileWebhookResult::Processed {
                    event_id: event_id.clone(),
                },
            ),
            Err(WebhookError::Ignored(reason)) => {
                tracing::info!(event_id = %event_id, event_type = %event.event_type, reason = %reason, "webhook dropped");
                (
                    WebhookEventRecord::ignored(&event_id, &event.event_type, &reason, payload),
                    ReconcileWebhookResult::Ignored {
                        event_id: event_id.clone(),
                        reason,
                    },
                )
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(event_id = %event_id, error = %e, "webhook reconciliation hit a storage failure");
                } else {
                    tracing::warn!(event_id = %event_id, error = %e, "webhook reconciliation failed");
                }
                let reason = e.to_string();
                (
                    WebhookEventRecord::failed(&event_id, &event.event_type, &reason, payload),
                    ReconcileWebhookResult::Failed {
                        event_id: event_id.clone(),
                        reason,
                    },
                )
            }
        };

        // 4. Record the outcome
        match self.webhook_events.save(audit).await {
            Ok(SaveResult::Inserted) => Ok(result),
            Ok(SaveResult::AlreadyExists) => {
                tracing::debug!(event_id = %event_id, "concurrent delivery recorded first");
                Ok(ReconcileWebhookResult::AlreadyProcessed { event_id })
            }
            Err(e) => {
                tracing::error!(event_id = %event_id, error = %e, "webhook audit record not saved");
                Ok(result)
            }
        }
    }

    fn parse(&self, cmd: &ReconcileWebhookCommand) -> Result<StripeEvent, BillingError> {
        let parsed = match &self.verifier {
            Some(verifier) => {
                let signature = cmd
                    .signature
                    .as_deref()
                    .ok_or_else(|| BillingError::invalid_webhook("missing Stripe-Signature header"))?;
                verifier.verify_and_parse(&cmd.payload, signature)
            }
            None => crate::domain::billing::parse_event(&cmd.payload),
        };
        parsed.map_err(|e| {
            tracing::warn!(error = %e, "webhook rejected");
            BillingError::from(e)
        })
    }

    async fn reconcile(&self, event: &StripeEvent) -> Result<(), WebhookError> {
        match event.parsed_type() {
            StripeEventType::CustomerSubscriptionUpdated
            | StripeEventType::CustomerSubscriptionDeleted => {}
            StripeEventType::Unknown => {
                return Err(WebhookError::Ignored(format!(
                    "unhandled event type {}",
                    event.event_type
                )));
            }
        }

        let subscription = event
            .subscription()
            .ok_or_else(|| WebhookError::Ignored("event object is not a subscription".into()))?;
        let status = subscription.parsed_status().ok_or_else(|| {
            WebhookError::Ignored(format!("unmodeled status {}", subscription.status))
        })?;

        // 1. Tracked record, or drop
        let mut record = self
            .records
            .find_by_remote_subscription_id(&subscription.id)
            .await?
            .ok_or_else(|| {
                WebhookError::Ignored(format!("untracked subscription {}", subscription.id))
            })?;

        // 2. Mirror status and expiry
        let now = Timestamp::now();
        self.mirror(&mut record, &subscription, status, now).await?;

        // 3. Invoice, found or synthesized
        let (mut invoice, fresh) = match self
            .invoices
            .find_by_remote_subscription_id(&subscription.id)
            .await?
        {
            Some(invoice) => (invoice, false),
            None => match self.synthesize_invoice(&record, &subscription, now).await? {
                Some(invoice) => (invoice, true),
                None => return Ok(()),
            },
        };

        // 4. Paid/failed from the previous status
        let action = invoice_action(event.previous_status(), status, fresh);
        let changed = self.apply(&mut invoice, action, now);

        if fresh {
            self.invoices.save(&invoice).await?;
        } else if changed {
            self.invoices.update(&invoice).await?;
        }
        if changed {
            self.publish_invoice_event(&invoice, action, now).await?;
        }
        Ok(())
    }

    async fn mirror(
        &self,
        record: &mut SubscriptionRecord,
        subscription: &StripeSubscription,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        match record.mirror_remote(status, subscription.period_end(), now) {
            MirrorOutcome::IgnoredTerminal => {
                return Err(WebhookError::Ignored(format!(
                    "subscription record {} is canceled",
                    record.id
                )));
            }
            MirrorOutcome::Rejected { from, to } => {
                tracing::warn!(
                    record_id = %record.id,
                    remote_subscription_id = %record.remote_subscription_id,
                    from = %from,
                    to = %to,
                    "remote status move refused by state machine"
                );
                return Err(WebhookError::Ignored(format!(
                    "status move {from} -> {to} refused for subscription record {}",
                    record.id
                )));
            }
            MirrorOutcome::Unchanged => {
                self.records.update(record).await?;
            }
            MirrorOutcome::Changed { previous } => {
                self.records.update(record).await?;
                tracing::info!(
                    record_id = %record.id,
                    remote_subscription_id = %record.remote_subscription_id,
                    from = %previous,
                    to = %record.status,
                    expires_at = %record.expires_at,
                    "subscription status mirrored"
                );
                self.publish_status_change(record, previous, now).await?;
            }
        }
        Ok(())
    }

    /// Builds an unpaid invoice from the remote items that map to local plans.
    async fn synthesize_invoice(
        &self,
        record: &SubscriptionRecord,
        subscription: &StripeSubscription,
        now: Timestamp,
    ) -> Result<Option<Invoice>, WebhookError> {
        let mut items = Vec::new();
        let mut currency = None;
        for item in &subscription.items.data {
            let Ok(catalog_id) = CatalogId::new(item.price.id.clone()) else {
                continue;
            };
            match self.plans.find_by_catalog_id(&catalog_id).await? {
                Some(plan) => {
                    currency.get_or_insert_with(|| plan.currency.clone());
                    items.push(LineItem::for_plan(&plan, item.quantity));
                }
                None => {
                    tracing::debug!(price_id = %item.price.id, "remote price has no local plan, skipped");
                }
            }
        }

        let Some(currency) = currency else {
            tracing::info!(
                remote_subscription_id = %subscription.id,
                "no remote item maps to a local plan, invoice not synthesized"
            );
            return Ok(None);
        };

        let mut invoice = Invoice::from_remote_subscription(
            record.contact_id,
            subscription.id.clone(),
            currency,
            items,
            now,
        );
        invoice.link_subscription(record.id, now);
        Ok(Some(invoice))
    }

    fn apply(&self, invoice: &mut Invoice, action: InvoiceAction, now: Timestamp) -> bool {
        let result = match action {
            InvoiceAction::MarkFailed => invoice.mark_failed(now),
            InvoiceAction::MarkPaid => invoice.mark_paid(now),
            InvoiceAction::Nothing => return false,
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(invoice_id = %invoice.id, error = %e, "invoice status left unchanged");
            false
        })
    }

    async fn publish_status_change(
        &self,
        record: &SubscriptionRecord,
        previous: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        if record.status == SubscriptionStatus::Canceled {
            let event = SubscriptionCanceled {
                event_id: EventId::new(),
                record_id: record.id,
                contact_id: record.contact_id,
                remote_subscription_id: record.remote_subscription_id.clone(),
                canceled_at: now,
            };
            publish_event(self.event_publisher.as_ref(), &event, None).await?;
        } else {
            let event = SubscriptionStatusChanged {
                event_id: EventId::new(),
                record_id: record.id,
                remote_subscription_id: record.remote_subscription_id.clone(),
                from: previous,
                to: record.status,
                expires_at: record.expires_at,
                changed_at: now,
            };
            publish_event(self.event_publisher.as_ref(), &event, None).await?;
        }
        Ok(())
    }

    async fn publish_invoice_event(
        &self,
        invoice: &Invoice,
        action: InvoiceAction,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        match action {
            InvoiceAction::MarkPaid => {
                let event = InvoicePaid {
                    event_id: EventId::new(),
                    invoice_id: invoice.id,
                    contact_id: invoice.contact_id,
                    total: invoice.total,
                    currency: invoice.currency.clone(),
                    remote_subscription_id: invoice.remote_subscription_id.clone(),
                    paid_at: now,
                };
                publish_event(self.event_publisher.as_ref(), &event, None).await?;
            }
            InvoiceAction::MarkFailed => {
                tracing::info!(invoice_id = %invoice.id, "invoice payment failed");
                let event = InvoicePaymentFailed {
                    event_id: EventId::new(),
                    invoice_id: invoice.id,
                    contact_id: invoice.contact_id,
                    remote_subscription_id: invoice.remote_subscription_id.clone(),
                    failed_at: now,
                };
                publish_event(self.event_publisher.as_ref(), &event, None).await?;
            }
            InvoiceAction::Nothing => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::billing::test_support::Fixture;
    use crate::domain::billing::{sign_payload, InvoiceStatus, Plan};
    use crate::domain::foundation::ContactId;
    use crate::ports::WebhookOutcome;
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "whsec_test_reconcile";

    fn handler(fx: &Fixture, verifier: Option<StripeWebhookVerifier>) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(
            verifier,
            fx.webhook_events.clone(),
            fx.records.clone(),
            fx.invoices.clone(),
            fx.plans.clone(),
            fx.events.clone(),
        )
    }

    fn delivery(
        event_id: &str,
        event_type: &str,
        status: &str,
        previous: Option<&str>,
    ) -> ReconcileWebhookCommand {
        let mut data = json!({
            "object": {
                "id": "sub_1",
                "object": "subscription",
                "status": status,
                "current_period_end": 1_767_225_600,
                "items": { "data": [
                    { "price": { "id": "gold" }, "quantity": 1 },
                    { "price": { "id": "legacy-addon" }, "quantity": 1 }
                ] }
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

    fn updated(event_id: &str, status: &str, previous: Option<&str>) -> ReconcileWebhookCommand {
        delivery(event_id, "customer.subscription.updated", status, previous)
    }

    async fn track(fx: &Fixture, status: SubscriptionStatus) -> (Plan, SubscriptionRecord) {
        let plan = fx.synced_plan("gold", 1000, 0).await;
        let record =
            SubscriptionRecord::start(ContactId::new(), &plan, "sub_1", status, Timestamp::now());
        fx.records.save(&record).await.unwrap();
        (plan, record)
    }

    async fn stored_record(fx: &Fixture) -> SubscriptionRecord {
        fx.records
            .find_by_remote_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Invoice Action Rules
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn active_to_past_due_fails_the_invoice() {
        use SubscriptionStatus::*;
        assert_eq!(invoice_action(Some(Active), PastDue, false), InvoiceAction::MarkFailed);
        assert_eq!(invoice_action(Some(Active), PastDue, true), InvoiceAction::MarkFailed);
    }

    #[test]
    fn entering_active_pays_only_fresh_invoices() {
        use SubscriptionStatus::*;
        assert_eq!(invoice_action(Some(Incomplete), Active, true), InvoiceAction::MarkPaid);
        assert_eq!(invoice_action(Some(PastDue), Active, true), InvoiceAction::MarkPaid);
        assert_eq!(invoice_action(Some(PastDue), Active, false), InvoiceAction::Nothing);
    }

    #[test]
    fn missing_previous_status_has_no_invoice_effect() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(invoice_action(None, status, true), InvoiceAction::Nothing);
            assert_eq!(invoice_action(None, status, false), InvoiceAction::Nothing);
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Reconciliation
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn past_due_after_active_fails_linked_invoice() {
        let fx = Fixture::new();
        let (_, record) = track(&fx, SubscriptionStatus::Active).await;
        let mut invoice = Invoice::from_remote_subscription(
            record.contact_id,
            "sub_1",
            crate::domain::foundation::CurrencyCode::new("usd").unwrap(),
            Vec::new(),
            Timestamp::now(),
        );
        invoice.mark_paid(Timestamp::now()).unwrap();
        invoice.link_subscription(record.id, Timestamp::now());
        fx.invoices.save(&invoice).await.unwrap();

        let result = handler(&fx, None)
            .handle(updated("evt_1", "past_due", Some("active")))
            .await
            .unwrap();

        assert_eq!(result, ReconcileWebhookResult::Processed { event_id: "evt_1".into() });
        assert_eq!(stored_record(&fx).await.status, SubscriptionStatus::PastDue);
        let stored = fx.invoices.find_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvoiceStatus::Failed);
        assert!(fx.events.has_event("invoice.payment_failed.v1"));
        assert!(fx.events.has_event("subscription.status_changed.v1"));
    }

    #[tokio::test]
    async fn period_end_becomes_expiry() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Active).await;

        handler(&fx, None)
            .handle(updated("evt_1", "active", None))
            .await
            .unwrap();

        assert_eq!(stored_record(&fx).await.expires_at.as_unix_secs(), 1_767_225_600);
    }

    #[tokio::test]
    async fn synthesized_invoice_skips_unknown_prices_and_is_paid_on_activation() {
        let fx = Fixture::new();
        let (_, record) = track(&fx, SubscriptionStatus::Incomplete).await;

        handler(&fx, None)
            .handle(updated("evt_1", "active", Some("incomplete")))
            .await
            .unwrap();

        let invoice = fx
            .invoices
            .find_by_remote_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.total.minor_units(), 1000);
        assert_eq!(invoice.status, InvoiceStatus::Paid);
        assert_eq!(invoice.subscription_record_id, Some(record.id));
        assert!(fx.events.has_event("invoice.paid.v1"));
    }

    #[tokio::test]
    async fn missing_previous_status_leaves_synthesized_invoice_unpaid() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Incomplete).await;

        handler(&fx, None)
            .handle(updated("evt_1", "active", None))
            .await
            .unwrap();

        assert_eq!(stored_record(&fx).await.status, SubscriptionStatus::Active);
        let invoice = fx
            .invoices
            .find_by_remote_subscription_id("sub_1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
    }

    #[tokio::test]
    async fn untracked_subscription_is_acknowledged_without_writes() {
        let fx = Fixture::new();
        fx.synced_plan("gold", 1000, 0).await;

        let result = handler(&fx, None)
            .handle(updated("evt_1", "active", Some("incomplete")))
            .await
            .unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
        assert_eq!(fx.records.count().await, 0);
        assert_eq!(fx.invoices.count().await, 0);
        assert_eq!(fx.webhook_events.count().await, 1);
    }

    #[tokio::test]
    async fn canceled_record_ignores_later_events() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Canceled).await;

        let result = handler(&fx, None)
            .handle(updated("evt_1", "active", Some("past_due")))
            .await
            .unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
        assert_eq!(stored_record(&fx).await.status, SubscriptionStatus::Canceled);
        assert_eq!(fx.invoices.count().await, 0);
    }

    #[tokio::test]
    async fn refused_status_move_is_ignored_without_writes() {
        let fx = Fixture::new();
        let (_, mut record) = track(&fx, SubscriptionStatus::Trialing).await;
        record.expires_at = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        fx.records.update(&record).await.unwrap();

        let result = handler(&fx, None)
            .handle(updated("evt_1", "past_due", Some("trialing")))
            .await
            .unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
        let stored = stored_record(&fx).await;
        assert_eq!(stored, record);
        assert!(!stored.has_access(Timestamp::now()));
        assert_eq!(fx.invoices.count().await, 0);
        assert_eq!(fx.events.event_count(), 0);
        let audit = fx.webhook_events.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(audit.outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn deleted_event_cancels_record() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::PastDue).await;

        handler(&fx, None)
            .handle(delivery("evt_1", "customer.subscription.deleted", "canceled", None))
            .await
            .unwrap();

        assert_eq!(stored_record(&fx).await.status, SubscriptionStatus::Canceled);
        assert!(fx.events.has_event("subscription.canceled.v1"));
    }

    #[tokio::test]
    async fn irrelevant_event_type_is_dropped() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Active).await;

        let result = handler(&fx, None)
            .handle(delivery("evt_1", "invoice.created", "past_due", Some("active")))
            .await
            .unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
        assert_eq!(stored_record(&fx).await.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn non_subscription_object_is_dropped() {
        let fx = Fixture::new();
        let body = json!({
            "id": "evt_1",
            "type": "customer.subscription.updated",
            "data": { "object": { "id": "cus_1", "object": "customer" } }
        });

        let result = handler(&fx, None)
            .handle(ReconcileWebhookCommand {
                payload: serde_json::to_vec(&body).unwrap(),
                signature: None,
            })
            .await
            .unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Ignored { .. }));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Idempotency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_event_id_is_not_reprocessed() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Active).await;
        let handler = handler(&fx, None);

        handler.handle(updated("evt_1", "past_due", Some("active"))).await.unwrap();
        let events_after_first = fx.events.event_count();
        let second = handler.handle(updated("evt_1", "past_due", Some("active"))).await.unwrap();

        assert_eq!(second, ReconcileWebhookResult::AlreadyProcessed { event_id: "evt_1".into() });
        assert_eq!(fx.events.event_count(), events_after_first);
    }

    #[tokio::test]
    async fn same_content_under_new_id_converges() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Incomplete).await;
        let handler = handler(&fx, None);

        handler.handle(updated("evt_1", "active", Some("incomplete"))).await.unwrap();
        let first = fx.invoices.find_by_remote_subscription_id("sub_1").await.unwrap().unwrap();
        handler.handle(updated("evt_2", "active", Some("incomplete"))).await.unwrap();

        assert_eq!(fx.invoices.count().await, 1);
        assert_eq!(fx.records.count().await, 1);
        let second = fx.invoices.find_by_remote_subscription_id("sub_1").await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn storage_failure_is_acknowledged_and_recorded_as_failed() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Active).await;
        fx.events.fail_with("bus down");

        let result = handler(&fx, None)
            .handle(updated("evt_1", "past_due", Some("active")))
            .await
            .unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Failed { ref event_id, .. } if event_id == "evt_1"));
        let audit = fx.webhook_events.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(audit.outcome, WebhookOutcome::Failed);
        assert!(audit.reason.unwrap().contains("bus down"));
    }

    #[tokio::test]
    async fn failed_delivery_is_not_reprocessed() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Active).await;
        fx.events.fail_with("bus down");
        let handler = handler(&fx, None);

        handler.handle(updated("evt_1", "past_due", Some("active"))).await.unwrap();
        let second = handler.handle(updated("evt_1", "past_due", Some("active"))).await.unwrap();

        assert_eq!(second, ReconcileWebhookResult::AlreadyProcessed { event_id: "evt_1".into() });
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Signatures
    // ════════════════════════════════════════════════════════════════════════════

    fn verifier() -> Option<StripeWebhookVerifier> {
        Some(StripeWebhookVerifier::new(SecretString::new(SECRET.to_string())))
    }

    #[tokio::test]
    async fn signed_delivery_is_accepted() {
        let fx = Fixture::new();
        track(&fx, SubscriptionStatus::Active).await;
        let mut cmd = updated("evt_1", "past_due", Some("active"));
        let now = chrono::Utc::now().timestamp();
        cmd.signature = Some(sign_payload(SECRET, now, &cmd.payload).unwrap());

        let result = handler(&fx, verifier()).handle(cmd).await.unwrap();

        assert!(matches!(result, ReconcileWebhookResult::Processed { .. }));
    }

    #[tokio::test]
    async fn bad_or_missing_signature_is_rejected() {
        let fx = Fixture::new();
        let handler = handler(&fx, verifier());

        let unsigned = updated("evt_1", "past_due", Some("active"));
        let err = handler.handle(unsigned).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidWebhook(_)));

        let mut forged = updated("evt_1", "past_due", Some("active"));
        let now = chrono::Utc::now().timestamp();
        forged.signature = Some(sign_payload("whsec_other", now, &forged.payload).unwrap());
        let err = handler.handle(forged).await.unwrap_err();
        assert!(matches!(err, BillingError::InvalidWebhook(_)));

        assert_eq!(fx.webhook_events.count().await, 0);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let fx = Fixture::new();

        let err = handler(&fx, None)
            .handle(ReconcileWebhookCommand {
                payload: b"{not json".to_vec(),
                signature: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidWebhook(_)));
    }
}
