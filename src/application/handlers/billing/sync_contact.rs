//! SyncContactHandler - Persist a contact, pushing front-end users to the processor.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Contact};
use crate::ports::{ContactRepository, RemoteObjectClient};

use super::synchronize::{synchronize, SyncOutcome};

#[derive(Debug, Clone)]
pub struct SyncContactCommand {
    pub contact: Contact,
}

#[derive(Debug, Clone)]
pub struct SyncContactResult {
    pub contact: Contact,
    /// `None` when the contact is not synced remotely.
    pub sync: Option<SyncOutcome>,
}

pub struct SyncContactHandler {
    contacts: Arc<dyn ContactRepository>,
    remote: Arc<dyn RemoteObjectClient>,
}

impl SyncContactHandler {
    pub fn new(contacts: Arc<dyn ContactRepository>, remote: Arc<dyn RemoteObjectClient>) -> Self {
        Self { contacts, remote }
    }

    pub async fn handle(&self, cmd: SyncContactCommand) -> Result<SyncContactResult, BillingError> {
        let mut contact = cmd.contact;

        // A remote id assigned earlier survives callers that edit a stale copy.
        if contact.remote_customer_id.is_none() {
            if let Some(stored) = self.contacts.find_by_id(&contact.id).await? {
                contact.remote_customer_id = stored.remote_customer_id;
            }
        }

        let sync = if contact.should_sync_remotely() {
            Some(synchronize(self.remote.as_ref(), &mut contact).await?)
        } else {
            None
        };

        self.contacts.save(&contact).await?;

        tracing::debug!(
            contact_id = %contact.id,
            synced = sync.is_some(),
            "contact saved"
        );
        Ok(SyncContactResult { contact, sync })
    }
}
