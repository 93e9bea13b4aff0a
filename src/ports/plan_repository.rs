//! Plan repository port.
//!
//! Plans are keyed by their catalog id, which is also their remote id.

use async_trait::async_trait;

use crate::domain::billing::Plan;
use crate::domain::foundation::{CatalogId, DomainError};

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Inserts or replaces the plan stored under its catalog id.
    async fn save(&self, plan: &Plan) -> Result<(), DomainError>;

    async fn find_by_catalog_id(&self, catalog_id: &CatalogId) -> Result<Option<Plan>, DomainError>;

    /// All plans, retired ones included.
    async fn list(&self) -> Result<Vec<Plan>, DomainError>;
}
