//! Plans and coupons.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{Coupon, Plan};
use crate::domain::foundation::{CatalogId, CouponId, DomainError};
use crate::ports::{CouponRepository, PlanRepository};

#[derive(Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<HashMap<CatalogId, Plan>>,
}

impl InMemoryPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn save(&self, plan: &Plan) -> Result<(), DomainError> {
        self.plans
            .write()
            .await
            .insert(plan.catalog_id.clone(), plan.clone());
        Ok(())
    }

    async fn find_by_catalog_id(&self, catalog_id: &CatalogId) -> Result<Option<Plan>, DomainError> {
        Ok(self.plans.read().await.get(catalog_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Plan>, DomainError> {
        let mut plans: Vec<Plan> = self.plans.read().await.values().cloned().collect();
        plans.sort_by(|a, b| a.catalog_id.as_str().cmp(b.catalog_id.as_str()));
        Ok(plans)
    }
}

#[derive(Default)]
pub struct InMemoryCouponRepository {
    coupons: RwLock<HashMap<CouponId, Coupon>>,
}

impl InMemoryCouponRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CouponRepository for InMemoryCouponRepository {
    async fn save(&self, coupon: &Coupon) -> Result<(), DomainError> {
        self.coupons.write().await.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CouponId) -> Result<Option<Coupon>, DomainError> {
        Ok(self.coupons.read().await.get(id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        Ok(self
            .coupons
            .read()
            .await
            .values()
            .find(|c| c.matches_code(code))
            .cloned())
    }
}
