//! CancelSubscriptionHandler - Operator-initiated cancellation.

use std::sync::Arc;

use crate::domain::billing::{BillingError, RemoteObjectKind, SubscriptionCanceled, SubscriptionRecord};
use crate::domain::foundation::{ContactId, EventId, SubscriptionRecordId, Timestamp};
use crate::ports::{publish_event, EventPublisher, RemoteObjectClient, SubscriptionRecordRepository};

/// Command to cancel one subscription on behalf of its owner.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub record_id: SubscriptionRecordId,
    pub contact_id: ContactId,
}

#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub record: SubscriptionRecord,
}

/// Handler for cancelling subscriptions.
///
/// The processor is told first. If that call fails for any reason, including
/// an unknown remote id, the local record keeps its status.
pub struct CancelSubscriptionHandler {
    records: Arc<dyn SubscriptionRecordRepository>,
    remote: Arc<dyn RemoteObjectClient>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CancelSubscriptionHandler {
    pub fn new(
        records: Arc<dyn SubscriptionRecordRepository>,
        remote: Arc<dyn RemoteObjectClient>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            records,
            remote,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, BillingError> {
        // 1. Find the record and check ownership
        let mut record = self
            .records
            .find_by_id(&cmd.record_id)
            .await?
            .ok_or_else(|| BillingError::not_found("subscription", cmd.record_id))?;

        if !record.is_owned_by(&cmd.contact_id) {
            return Err(BillingError::forbidden(format!(
                "subscription {} belongs to another contact",
                record.id
            )));
        }
        if record.is_canceled() {
            return Err(BillingError::invalid_state("canceled", "cancel"));
        }

        // 2. Cancel remotely; abort on any failure
        if let Err(e) = self
            .remote
            .delete(RemoteObjectKind::Subscription, &record.remote_subscription_id)
            .await
        {
            tracing::warn!(
                record_id = %record.id,
                remote_subscription_id = %record.remote_subscription_id,
                error = %e,
                "remote cancel failed, local record left unchanged"
            );
            return Err(e.into());
        }

        // 3. Mirror locally
        let now = Timestamp::now();
        record.cancel(now)?;
        self.records.update(&record).await?;

        tracing::info!(
            record_id = %record.id,
            remote_subscription_id = %record.remote_subscription_id,
            "subscription canceled"
        );

        // 4. Publish
        let event = SubscriptionCanceled {
            event_id: EventId::new(),
            record_id: record.id,
            contact_id: record.contact_id,
            remote_subscription_id: record.remote_subscription_id.clone(),
            canceled_at: now,
        };
        publish_event(self.event_publisher.as_ref(), &event, None).await?;

        Ok(CancelSubscriptionResult { record })
    }
}
