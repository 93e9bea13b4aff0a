//! Subscription record repository port.
//!
//! # Design
//!
//! - **Unique remote id**: at most one record per remote subscription id.
//!   Checkout completion and a webhook can race to create the same record;
//!   the loser gets `SubscriptionExists` instead of a duplicate row.
//! - **Lookup by remote id**: the webhook path only knows the processor's id.

use async_trait::async_trait;

use crate::domain::billing::SubscriptionRecord;
use crate::domain::foundation::{ContactId, DomainError, SubscriptionRecordId};

#[async_trait]
pub trait SubscriptionRecordRepository: Send + Sync {
    /// Save a new record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if a record already tracks the remote subscription id
    /// - `DatabaseError` on persistence failure
    async fn save(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Update an existing record.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the record does not exist
    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    async fn find_by_id(
        &self,
        id: &SubscriptionRecordId,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Every record the contact owns, oldest first.
    async fn find_by_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError>;

    async fn delete(&self, id: &SubscriptionRecordId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_record_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRecordRepository) {}
    }
}
