//! Invoice repository port.

use async_trait::async_trait;

use crate::domain::billing::Invoice;
use crate::domain::foundation::{DomainError, EstimateId, InvoiceId};

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Save a new invoice.
    ///
    /// # Errors
    ///
    /// - `InvoiceExists` if an invoice with this id is already stored
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError>;

    /// # Errors
    ///
    /// - `InvoiceNotFound` if the invoice does not exist
    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError>;

    /// The invoice created for a remote subscription, if any.
    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Option<Invoice>, DomainError>;

    /// The invoice a checkout produced from this estimate, if any.
    async fn find_by_estimate_id(&self, estimate_id: &EstimateId) -> Result<Option<Invoice>, DomainError>;
}
