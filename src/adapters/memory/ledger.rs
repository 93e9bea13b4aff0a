//! Subscription records and invoices.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Invoice, SubscriptionRecord};
use crate::domain::foundation::{
    ContactId, DomainError, ErrorCode, EstimateId, InvoiceId, SubscriptionRecordId,
};
use crate::ports::{InvoiceRepository, SubscriptionRecordRepository};

/// Enforces the same uniqueness on `remote_subscription_id` as the
/// PostgreSQL schema.
#[derive(Default)]
pub struct InMemorySubscriptionRecordRepository {
    records: RwLock<HashMap<SubscriptionRecordId, SubscriptionRecord>>,
}

impl InMemorySubscriptionRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl SubscriptionRecordRepository for InMemorySubscriptionRecordRepository {
    async fn save(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let taken = records.values().any(|r| {
            r.id == record.id || r.remote_subscription_id == record.remote_subscription_id
        });
        if taken {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                format!(
                    "subscription {} is already tracked",
                    record.remote_subscription_id
                ),
            ));
        }
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription record {} not found", record.id),
            )),
        }
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionRecordId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .find(|r| r.remote_subscription_id == remote_subscription_id)
            .cloned())
    }

    async fn find_by_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let mut records: Vec<SubscriptionRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.is_owned_by(contact_id))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn delete(&self, id: &SubscriptionRecordId) -> Result<(), DomainError> {
        self.records.write().await.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.invoices.read().await.len()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut invoices = self.invoices.write().await;
        if invoices.contains_key(&invoice.id) {
            return Err(DomainError::new(
                ErrorCode::InvoiceExists,
                format!("invoice {} already exists", invoice.id),
            ));
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let mut invoices = self.invoices.write().await;
        match invoices.get_mut(&invoice.id) {
            Some(existing) => {
                *existing = invoice.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::InvoiceNotFound,
                format!("invoice {} not found", invoice.id),
            )),
        }
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError> {
        Ok(self.invoices.read().await.get(id).cloned())
    }

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Option<Invoice>, DomainError> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .filter(|i| i.remote_subscription_id.as_deref() == Some(remote_subscription_id))
            .min_by_key(|i| i.created_at)
            .cloned())
    }

    async fn find_by_estimate_id(&self, estimate_id: &EstimateId) -> Result<Option<Invoice>, DomainError> {
        Ok(self
            .invoices
            .read()
            .await
            .values()
            .find(|i| i.estimate_id.as_ref() == Some(estimate_id))
            .cloned())
    }
}
