//! DeleteContactHandler - Removes a contact and everything it subscribes to.

use std::sync::Arc;

use crate::domain::billing::{BillingError, RemoteObjectKind, SubscriptionCanceled};
use crate::domain::foundation::{ContactId, EventId, Timestamp};
use crate::ports::{
    publish_event, ContactRepository, EventPublisher, RemoteObjectClient,
    SubscriptionRecordRepository,
};

#[derive(Debug, Clone)]
pub struct DeleteContactCommand {
    pub contact_id: ContactId,
}

#[derive(Debug, Clone)]
pub struct DeleteContactResult {
    /// Remote subscriptions canceled on the way out.
    pub canceled: Vec<String>,
}

/// Handler for deleting contacts.
///
/// Every live subscription is canceled remotely, and its record marked
/// canceled, before the contact goes. The first remote failure aborts the
/// deletion; records already canceled remotely stay canceled locally.
pub struct DeleteContactHandler {
    contacts: Arc<dyn ContactRepository>,
    records: Arc<dyn SubscriptionRecordRepository>,
    remote: Arc<dyn RemoteObjectClient>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl DeleteContactHandler {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        records: Arc<dyn SubscriptionRecordRepository>,
        remote: Arc<dyn RemoteObjectClient>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            contacts,
            records,
            remote,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: DeleteContactCommand) -> Result<DeleteContactResult, BillingError> {
        // 1. Load
        let contact = self
            .contacts
            .find_by_id(&cmd.contact_id)
            .await?
            .ok_or_else(|| BillingError::not_found("contact", cmd.contact_id))?;
        let records = self.records.find_by_contact(&contact.id).await?;

        // 2. Cancel remotely; each success is mirrored locally before the next
        let now = Timestamp::now();
        let mut canceled = Vec::new();
        for mut record in records.iter().filter(|r| !r.is_canceled()).cloned() {
            if let Err(e) = self
                .remote
                .delete(RemoteObjectKind::Subscription, &record.remote_subscription_id)
                .await
            {
                tracing::warn!(
                    contact_id = %contact.id,
                    remote_subscription_id = %record.remote_subscription_id,
                    already_canceled = canceled.len(),
                    error = %e,
                    "remote cancel failed, contact deletion aborted"
                );
                return Err(e.into());
            }

            record.cancel(now)?;
            self.records.update(&record).await?;
            let event = SubscriptionCanceled {
                event_id: EventId::new(),
                record_id: record.id,
                contact_id: record.contact_id,
                remote_subscription_id: record.remote_subscription_id.clone(),
                canceled_at: now,
            };
            publish_event(self.event_publisher.as_ref(), &event, None).await?;
            canceled.push(record.remote_subscription_id);
        }

        // 3. Local cleanup
        for record in &records {
            self.records.delete(&record.id).await?;
        }
        self.contacts.delete(&contact.id).await?;

        tracing::info!(
            contact_id = %contact.id,
            records = records.len(),
            canceled = canceled.len(),
            "contact deleted"
        );
        Ok(DeleteContactResult { canceled })
    }
}
