//! Shared tail of a checkout: paid invoice, subscription records, consumed estimate.
//!
//! Used by `CompleteCheckoutHandler` after the client confirmed an intent, and
//! by `StartPaymentHandler` when nothing is payable.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{
    BillingError, Estimate, Invoice, InvoicePaid, MirrorOutcome, Plan, RemoteObjectKind,
    SubscriptionActivated, SubscriptionRecord, SubscriptionStatus,
};
use crate::domain::foundation::{ContactId, ErrorCode, EventId, Timestamp};
use crate::ports::{
    publish_event, ContactRepository, EstimateRepository, EventPublisher, InvoiceRepository,
    PlanRepository, RemoteObjectClient, SubscriptionRecordRepository,
};

/// What a finished checkout produced.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub invoice: Invoice,
    /// Empty for one-off purchases.
    pub records: Vec<SubscriptionRecord>,
}

/// Ports every checkout step touches.
#[derive(Clone)]
pub struct CheckoutPorts {
    pub remote: Arc<dyn RemoteObjectClient>,
    pub plans: Arc<dyn PlanRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub estimates: Arc<dyn EstimateRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub records: Arc<dyn SubscriptionRecordRepository>,
    pub event_publisher: Arc<dyn EventPublisher>,
}

pub(super) struct CheckoutFinalizer {
    ports: CheckoutPorts,
}

impl CheckoutFinalizer {
    pub(super) fn new(ports: CheckoutPorts) -> Self {
        Self { ports }
    }

    /// Finishes a paid (or free) estimate.
    ///
    /// `status` is what new records start in: `active` after a confirmed
    /// payment, the processor's own status on the zero-value path.
    pub(super) async fn finalize(
        &self,
        estimate: &Estimate,
        payment_method: Option<&str>,
        status: SubscriptionStatus,
    ) -> Result<CheckoutReceipt, BillingError> {
        let now = Timestamp::now();

        // 1. Paid invoice, persisted before any record
        let mut invoice = self.paid_invoice(estimate, now).await?;

        let Some(remote_subscription_id) = estimate.remote_subscription_id.as_deref() else {
            self.ports.estimates.delete(&estimate.id).await?;
            tracing::info!(estimate_id = %estimate.id, invoice_id = %invoice.id, "one-off checkout completed");
            return Ok(CheckoutReceipt {
                invoice,
                records: Vec::new(),
            });
        };

        // 2. Confirmed card becomes the subscription's default
        if let Some(payment_method) = payment_method {
            self.ports
                .remote
                .create_or_update(
                    RemoteObjectKind::Subscription,
                    &json!({ "default_payment_method": payment_method }),
                    Some(remote_subscription_id),
                    None,
                )
                .await?;
        }

        // 3. One record per remote subscription, reached through each plan item
        let mut records: Vec<SubscriptionRecord> = Vec::new();
        for item in estimate.plan_items() {
            let Some(catalog_id) = item.plan_catalog_id() else {
                continue;
            };
            let plan = self
                .ports
                .plans
                .find_by_catalog_id(catalog_id)
                .await?
                .ok_or_else(|| BillingError::not_found("plan", catalog_id))?;

            let record = self
                .track(estimate.contact_id, &plan, remote_subscription_id, status, now)
                .await?;
            records.retain(|r| r.id != record.id);
            records.push(record);
        }

        if let Some(record) = records.last() {
            invoice.link_subscription(record.id, now);
            self.ports.invoices.update(&invoice).await?;
        }

        // 4. Consume the estimate
        self.ports.estimates.delete(&estimate.id).await?;

        tracing::info!(
            estimate_id = %estimate.id,
            invoice_id = %invoice.id,
            remote_subscription_id = %remote_subscription_id,
            records = records.len(),
            "subscription checkout completed"
        );
        Ok(CheckoutReceipt { invoice, records })
    }

    async fn paid_invoice(&self, estimate: &Estimate, now: Timestamp) -> Result<Invoice, BillingError> {
        let existing = self.ports.invoices.find_by_estimate_id(&estimate.id).await?;
        let is_new = existing.is_none();
        let mut invoice = existing.unwrap_or_else(|| Invoice::from_estimate(estimate, now));

        let newly_paid = invoice.mark_paid(now)?;
        if is_new {
            self.ports.invoices.save(&invoice).await?;
        } else if newly_paid {
            self.ports.invoices.update(&invoice).await?;
        }

        if newly_paid {
            let event = InvoicePaid {
                event_id: EventId::new(),
                invoice_id: invoice.id,
                contact_id: invoice.contact_id,
                total: invoice.total,
                currency: invoice.currency.clone(),
                remote_subscription_id: invoice.remote_subscription_id.clone(),
                paid_at: now,
            };
            publish_event(self.ports.event_publisher.as_ref(), &event, None).await?;
        }
        Ok(invoice)
    }

    /// Finds or creates the record for `remote_subscription_id`.
    async fn track(
        &self,
        contact_id: ContactId,
        plan: &Plan,
        remote_subscription_id: &str,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, BillingError> {
        if let Some(existing) = self
            .ports
            .records
            .find_by_remote_subscription_id(remote_subscription_id)
            .await?
        {
            return self.bring_to(existing, contact_id, plan, status, now).await;
        }

        let record = SubscriptionRecord::start(contact_id, plan, remote_subscription_id, status, now);
        match self.ports.records.save(&record).await {
            Ok(()) => {
                self.publish_activated(&record, now).await?;
                Ok(record)
            }
            // A concurrent completion inserted it between lookup and save.
            Err(e) if e.code == ErrorCode::SubscriptionExists => {
                let existing = self
                    .ports
                    .records
                    .find_by_remote_subscription_id(remote_subscription_id)
                    .await?
                    .ok_or_else(|| BillingError::from(e))?;
                self.bring_to(existing, contact_id, plan, status, now).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn bring_to(
        &self,
        mut record: SubscriptionRecord,
        contact_id: ContactId,
        plan: &Plan,
        status: SubscriptionStatus,
        now: Timestamp,
    ) -> Result<SubscriptionRecord, BillingError> {
        if !record.is_owned_by(&contact_id) {
            return Err(BillingError::forbidden(format!(
                "subscription {} belongs to another contact",
                record.remote_subscription_id
            )));
        }

        let changed = if status == SubscriptionStatus::Active {
            record.activate(plan, now)?
        } else {
            matches!(
                record.mirror_remote(status, None, now),
                MirrorOutcome::Changed { .. }
            )
        };
        self.ports.records.update(&record).await?;

        if changed {
            self.publish_activated(&record, now).await?;
        }
        Ok(record)
    }

    async fn publish_activated(
        &self,
        record: &SubscriptionRecord,
        now: Timestamp,
    ) -> Result<(), BillingError> {
        tracing::info!(
            record_id = %record.id,
            remote_subscription_id = %record.remote_subscription_id,
            status = %record.status,
            expires_at = %record.expires_at,
            "subscription activated"
        );
        let event = SubscriptionActivated {
            event_id: EventId::new(),
            record_id: record.id,
            contact_id: record.contact_id,
            plan_id: record.plan_id.clone(),
            remote_subscription_id: record.remote_subscription_id.clone(),
            status: record.status,
            expires_at: record.expires_at,
            activated_at: now,
        };
        publish_event(self.ports.event_publisher.as_ref(), &event, None).await?;
        Ok(())
    }
}
