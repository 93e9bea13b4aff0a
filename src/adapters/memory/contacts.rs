//! Contacts and estimates.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Contact, Estimate};
use crate::domain::foundation::{ContactId, DomainError, EstimateId};
use crate::ports::{ContactRepository, EstimateRepository};

#[derive(Default)]
pub struct InMemoryContactRepository {
    contacts: RwLock<HashMap<ContactId, Contact>>,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn save(&self, contact: &Contact) -> Result<(), DomainError> {
        self.contacts.write().await.insert(contact.id, contact.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError> {
        Ok(self.contacts.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &ContactId) -> Result<(), DomainError> {
        self.contacts.write().await.remove(id);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEstimateRepository {
    estimates: RwLock<HashMap<EstimateId, Estimate>>,
}

impl InMemoryEstimateRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EstimateRepository for InMemoryEstimateRepository {
    async fn save(&self, estimate: &Estimate) -> Result<(), DomainError> {
        self.estimates
            .write()
            .await
            .insert(estimate.id, estimate.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &EstimateId) -> Result<Option<Estimate>, DomainError> {
        Ok(self.estimates.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &EstimateId) -> Result<(), DomainError> {
        self.estimates.write().await.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::CurrencyCode;

    #[tokio::test]
    async fn contact_round_trip_and_delete() {
        let repo = InMemoryContactRepository::new();
        let contact = Contact::new("ada@example.com", "Ada", "Lovelace").unwrap();
        repo.save(&contact).await.unwrap();
        assert_eq!(repo.find_by_id(&contact.id).await.unwrap(), Some(contact.clone()));

        repo.delete(&contact.id).await.unwrap();
        assert!(repo.find_by_id(&contact.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_unknown_estimate_is_a_no_op() {
        let repo = InMemoryEstimateRepository::new();
        let estimate = Estimate::new(ContactId::new(), CurrencyCode::new("usd").unwrap());
        repo.save(&estimate).await.unwrap();

        repo.delete(&EstimateId::new()).await.unwrap();
        assert!(repo.find_by_id(&estimate.id).await.unwrap().is_some());
    }
}
