//! SaveCouponHandler - Create or edit a coupon and mirror it remotely.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Coupon, CouponDiscount, CouponDuration};
use crate::domain::foundation::CouponId;
use crate::ports::{CouponRepository, RemoteObjectClient};

use super::synchronize::{synchronize, SyncOutcome};

#[derive(Debug, Clone)]
pub struct SaveCouponCommand {
    /// `None` creates a new coupon.
    pub coupon_id: Option<CouponId>,
    pub code: String,
    pub title: String,
    pub discount: CouponDiscount,
    pub duration: CouponDuration,
}

#[derive(Debug, Clone)]
pub struct SaveCouponResult {
    pub coupon: Coupon,
    pub sync: SyncOutcome,
}

pub struct SaveCouponHandler {
    coupons: Arc<dyn CouponRepository>,
    remote: Arc<dyn RemoteObjectClient>,
}

impl SaveCouponHandler {
    pub fn new(coupons: Arc<dyn CouponRepository>, remote: Arc<dyn RemoteObjectClient>) -> Self {
        Self { coupons, remote }
    }

    pub async fn handle(&self, cmd: SaveCouponCommand) -> Result<SaveCouponResult, BillingError> {
        let mut coupon = match cmd.coupon_id {
            Some(id) => {
                let mut coupon = self
                    .coupons
                    .find_by_id(&id)
                    .await?
                    .ok_or_else(|| BillingError::not_found("coupon", id))?;
                if !coupon.matches_code(&cmd.code) {
                    return Err(BillingError::validation("code", "coupon codes cannot change"));
                }
                coupon.rename(cmd.title)?;
                coupon.change_terms(cmd.discount, cmd.duration)?;
                coupon
            }
            None => {
                if self.coupons.find_by_code(&cmd.code).await?.is_some() {
                    return Err(BillingError::conflict(format!(
                        "coupon code {} is taken",
                        cmd.code.trim().to_uppercase()
                    )));
                }
                Coupon::new(cmd.code, cmd.title, cmd.discount, cmd.duration)?
            }
        };

        let sync = synchronize(self.remote.as_ref(), &mut coupon).await?;
        self.coupons.save(&coupon).await?;

        tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "coupon saved");
        Ok(SaveCouponResult { coupon, sync })
    }
}
