//! SavePlanHandler - Create or edit a catalog plan and mirror it remotely.

use std::sync::Arc;

use crate::domain::billing::{BillingError, BillingInterval, Plan};
use crate::domain::foundation::{CatalogId, CurrencyCode, Money};
use crate::ports::{PlanRepository, RemoteObjectClient};

use super::synchronize::{synchronize, SyncOutcome};

/// Command to create or edit a plan.
#[derive(Debug, Clone)]
pub struct SavePlanCommand {
    pub catalog_id: CatalogId,
    pub title: String,
    pub price: Money,
    pub currency: CurrencyCode,
    pub interval: BillingInterval,
    pub trial_period_days: u32,
    pub retired: bool,
}

#[derive(Debug, Clone)]
pub struct SavePlanResult {
    pub plan: Plan,
    pub sync: SyncOutcome,
}

/// Handler for saving plans.
///
/// Price, currency, interval and trial are fixed once the processor holds
/// the plan; only the title and the retired flag can change afterwards.
pub struct SavePlanHandler {
    plans: Arc<dyn PlanRepository>,
    remote: Arc<dyn RemoteObjectClient>,
}

impl SavePlanHandler {
    pub fn new(plans: Arc<dyn PlanRepository>, remote: Arc<dyn RemoteObjectClient>) -> Self {
        Self { plans, remote }
    }

    pub async fn handle(&self, cmd: SavePlanCommand) -> Result<SavePlanResult, BillingError> {
        // 1. Load or build the plan, applying the edit
        let mut plan = match self.plans.find_by_catalog_id(&cmd.catalog_id).await? {
            Some(mut plan) => {
                plan.rename(cmd.title)?;
                plan.reprice(cmd.price)?;
                plan.change_currency(cmd.currency)?;
                plan.change_interval(cmd.interval)?;
                plan.change_trial(cmd.trial_period_days)?;
                plan
            }
            None => Plan::new(
                cmd.catalog_id,
                cmd.title,
                cmd.price,
                cmd.currency,
                cmd.interval,
                cmd.trial_period_days,
            )?,
        };
        if cmd.retired && !plan.retired {
            plan.retire();
        }

        // 2. Mirror remotely; a failure aborts the local write
        let sync = synchronize(self.remote.as_ref(), &mut plan).await?;

        // 3. Persist
        self.plans.save(&plan).await?;

        tracing::info!(
            catalog_id = %plan.catalog_id,
            retired = plan.retired,
            created_remotely = sync.assigned_id().is_some(),
            "plan saved"
        );
        Ok(SavePlanResult { plan, sync })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPlanRepository;
    use crate::adapters::stripe::MockRemoteObjectClient;
    use crate::domain::billing::RemoteObjectKind;
    use crate::ports::RemoteError;

    fn command(price: i64) -> SavePlanCommand {
        SavePlanCommand {
            catalog_id: CatalogId::new("gold-monthly").unwrap(),
            title: "Gold".to_string(),
            price: Money::from_minor(price),
            currency: CurrencyCode::new("usd").unwrap(),
            interval: BillingInterval::Month,
            trial_period_days: 0,
            retired: false,
        }
    }

    fn handler(
        plans: Arc<InMemoryPlanRepository>,
        remote: &MockRemoteObjectClient,
    ) -> SavePlanHandler {
        SavePlanHandler::new(plans, Arc::new(remote.clone()))
    }

    #[tokio::test]
    async fn new_plan_is_created_remotely_under_catalog_id() {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let remote = MockRemoteObjectClient::new();

        let result = handler(plans.clone(), &remote).handle(command(1000)).await.unwrap();

        assert_eq!(result.plan.remote_id.as_deref(), Some("gold-monthly"));
        let stored = remote.object(RemoteObjectKind::Plan, "gold-monthly").unwrap();
        assert_eq!(stored["amount"], 1000);
        let saved = plans
            .find_by_catalog_id(&CatalogId::new("gold-monthly").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert!(saved.is_synchronized());
    }

    #[tokio::test]
    async fn renaming_a_synced_plan_updates_remotely() {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let remote = MockRemoteObjectClient::new();
        let handler = handler(plans, &remote);
        handler.handle(command(1000)).await.unwrap();

        let mut rename = command(1000);
        rename.title = "Gold Plus".to_string();
        rename.retired = true;
        let result = handler.handle(rename).await.unwrap();

        assert_eq!(result.sync, SyncOutcome::Updated);
        let stored = remote.object(RemoteObjectKind::Plan, "gold-monthly").unwrap();
        assert_eq!(stored["nickname"], "Gold Plus");
        assert_eq!(stored["active"], false);
    }

    #[tokio::test]
    async fn repricing_a_synced_plan_is_rejected() {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let remote = MockRemoteObjectClient::new();
        let handler = handler(plans, &remote);
        handler.handle(command(1000)).await.unwrap();
        remote.clear_calls();

        let err = handler.handle(command(1500)).await.unwrap_err();

        assert!(matches!(err, BillingError::ValidationFailed { ref field, .. } if field == "price"));
        assert_eq!(remote.calls().len(), 0);
    }

    #[tokio::test]
    async fn remote_failure_aborts_local_write() {
        let plans = Arc::new(InMemoryPlanRepository::new());
        let remote = MockRemoteObjectClient::new();
        remote.set_error(RemoteError::provider("invalid currency"));

        let result = handler(plans.clone(), &remote).handle(command(1000)).await;

        assert!(matches!(result, Err(BillingError::RemoteUnavailable { .. })));
        assert!(plans.list().await.unwrap().is_empty());
    }
}
