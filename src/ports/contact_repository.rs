//! Contact repository port.

use async_trait::async_trait;

use crate::domain::billing::Contact;
use crate::domain::foundation::{ContactId, DomainError};

#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Inserts or replaces the contact.
    async fn save(&self, contact: &Contact) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError>;

    /// # Errors
    ///
    /// - `ContactNotFound` if the contact does not exist
    async fn delete(&self, id: &ContactId) -> Result<(), DomainError>;
}
