//! Handled webhook deliveries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    records: RwLock<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.event_id) {
            Ok(SaveResult::AlreadyExists)
        } else {
            records.insert(record.event_id.clone(), record);
            Ok(SaveResult::Inserted)
        }
    }

    async fn delete_before(&self, timestamp: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| r.processed_at >= timestamp);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::WebhookOutcome;
    use chrono::Duration;

    #[tokio::test]
    async fn second_save_reports_existing() {
        let repo = InMemoryWebhookEventRepository::new();
        let record = WebhookEventRecord::success("evt_1", "customer.subscription.updated", serde_json::json!({}));

        assert_eq!(repo.save(record.clone()).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.save(record).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(repo.count().await, 1);

        let found = repo.find_by_event_id("evt_1").await.unwrap().unwrap();
        assert_eq!(found.outcome, WebhookOutcome::Success);
    }

    #[tokio::test]
    async fn delete_before_prunes_old_records() {
        let repo = InMemoryWebhookEventRepository::new();
        let mut old = WebhookEventRecord::ignored("evt_old", "invoice.paid", "untracked", serde_json::json!({}));
        old.processed_at = Utc::now() - Duration::days(40);
        repo.save(old).await.unwrap();
        repo.save(WebhookEventRecord::success("evt_new", "invoice.paid", serde_json::json!({})))
            .await
            .unwrap();

        let removed = repo.delete_before(Utc::now() - Duration::days(30)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.find_by_event_id("evt_new").await.unwrap().is_some());
    }
}
