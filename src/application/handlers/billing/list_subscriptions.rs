//! ListSubscriptionsHandler - A contact's subscriptions with access evaluated now.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, SubscriptionRecord, SubscriptionStatus};
use crate::domain::foundation::{CatalogId, ContactId, SubscriptionRecordId, Timestamp};
use crate::ports::{ContactRepository, SubscriptionRecordRepository};

#[derive(Debug, Clone)]
pub struct ListSubscriptionsQuery {
    pub contact_id: ContactId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSummary {
    pub record_id: SubscriptionRecordId,
    pub plan_id: CatalogId,
    pub status: SubscriptionStatus,
    pub expires_at: Timestamp,
    pub remote_subscription_id: String,
    pub has_access: bool,
    pub is_expired: bool,
}

impl SubscriptionSummary {
    fn at(record: &SubscriptionRecord, now: Timestamp) -> Self {
        Self {
            record_id: record.id,
            plan_id: record.plan_id.clone(),
            status: record.status,
            expires_at: record.expires_at,
            remote_subscription_id: record.remote_subscription_id.clone(),
            has_access: record.has_access(now),
            is_expired: record.is_expired(now),
        }
    }
}

pub struct ListSubscriptionsHandler {
    contacts: Arc<dyn ContactRepository>,
    records: Arc<dyn SubscriptionRecordRepository>,
}

impl ListSubscriptionsHandler {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        records: Arc<dyn SubscriptionRecordRepository>,
    ) -> Self {
        Self { contacts, records }
    }

    pub async fn handle(
        &self,
        query: ListSubscriptionsQuery,
    ) -> Result<Vec<SubscriptionSummary>, BillingError> {
        if self.contacts.find_by_id(&query.contact_id).await?.is_none() {
            return Err(BillingError::not_found("contact", query.contact_id));
        }

        let now = Timestamp::now();
        let records = self.records.find_by_contact(&query.contact_id).await?;
        Ok(records.iter().map(|r| SubscriptionSummary::at(r, now)).collect())
    }
}
