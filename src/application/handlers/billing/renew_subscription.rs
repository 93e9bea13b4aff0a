//! RenewSubscriptionHandler - Starts a fresh checkout for a plan.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Estimate};
use crate::domain::foundation::{CatalogId, ContactId};
use crate::ports::{ContactRepository, EstimateRepository, PlanRepository};

#[derive(Debug, Clone)]
pub struct RenewSubscriptionCommand {
    pub contact_id: ContactId,
    pub catalog_id: CatalogId,
}

/// Builds a one-plan estimate billed to the contact's default address.
///
/// The estimate then goes through the normal payment and completion steps.
pub struct RenewSubscriptionHandler {
    contacts: Arc<dyn ContactRepository>,
    plans: Arc<dyn PlanRepository>,
    estimates: Arc<dyn EstimateRepository>,
}

impl RenewSubscriptionHandler {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        plans: Arc<dyn PlanRepository>,
        estimates: Arc<dyn EstimateRepository>,
    ) -> Self {
        Self {
            contacts,
            plans,
            estimates,
        }
    }

    pub async fn handle(&self, cmd: RenewSubscriptionCommand) -> Result<Estimate, BillingError> {
        let contact = self
            .contacts
            .find_by_id(&cmd.contact_id)
            .await?
            .ok_or_else(|| BillingError::not_found("contact", cmd.contact_id))?;
        let plan = self
            .plans
            .find_by_catalog_id(&cmd.catalog_id)
            .await?
            .ok_or_else(|| BillingError::not_found("plan", &cmd.catalog_id))?;

        if plan.retired {
            return Err(BillingError::validation(
                "plan",
                format!("plan {} is no longer offered", plan.catalog_id),
            ));
        }

        let estimate = Estimate::for_renewal(&contact, &plan);
        self.estimates.save(&estimate).await?;

        tracing::info!(
            contact_id = %contact.id,
            catalog_id = %plan.catalog_id,
            estimate_id = %estimate.id,
            "renewal estimate created"
        );
        Ok(estimate)
    }
}
