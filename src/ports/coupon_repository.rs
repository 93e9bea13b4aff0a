//! Coupon repository port.

use async_trait::async_trait;

use crate::domain::billing::Coupon;
use crate::domain::foundation::{CouponId, DomainError};

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Inserts or replaces the coupon.
    async fn save(&self, coupon: &Coupon) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &CouponId) -> Result<Option<Coupon>, DomainError>;

    /// Looks a coupon up by its redemption code, ignoring case.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn CouponRepository) {}
    }
}
