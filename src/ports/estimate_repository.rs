//! Estimate repository port.
//!
//! Estimates live only until checkout completes; completion deletes them.

use async_trait::async_trait;

use crate::domain::billing::Estimate;
use crate::domain::foundation::{DomainError, EstimateId};

#[async_trait]
pub trait EstimateRepository: Send + Sync {
    /// Inserts or replaces the estimate.
    async fn save(&self, estimate: &Estimate) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &EstimateId) -> Result<Option<Estimate>, DomainError>;

    /// Removes a consumed estimate. Deleting a missing estimate is not an error.
    async fn delete(&self, id: &EstimateId) -> Result<(), DomainError>;
}
