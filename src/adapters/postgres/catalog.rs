//! PostgreSQL implementations of PlanRepository and CouponRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{BillingInterval, Coupon, CouponDiscount, CouponDuration, Plan};
use crate::domain::foundation::{
    CatalogId, CouponId, CurrencyCode, DomainError, Money, Timestamp,
};
use crate::ports::{CouponRepository, PlanRepository};

use super::row_error;

pub struct PostgresPlanRepository {
    pool: PgPool,
}

impl PostgresPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    catalog_id: String,
    title: String,
    price_minor: i64,
    currency: String,
    billing_interval: String,
    trial_period_days: i32,
    remote_id: Option<String>,
    retired: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PlanRow> for Plan {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(Plan {
            catalog_id: CatalogId::new(row.catalog_id).map_err(row_error("catalog_id"))?,
            title: row.title,
            price: Money::from_minor(row.price_minor),
            currency: CurrencyCode::new(&row.currency).map_err(row_error("currency"))?,
            interval: row
                .billing_interval
                .parse::<BillingInterval>()
                .map_err(row_error("billing_interval"))?,
            trial_period_days: u32::try_from(row.trial_period_days).unwrap_or(0),
            remote_id: row.remote_id,
            retired: row.retired,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const PLAN_COLUMNS: &str = "catalog_id, title, price_minor, currency, billing_interval, \
     trial_period_days, remote_id, retired, created_at, updated_at";

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn save(&self, plan: &Plan) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO plans (
                catalog_id, title, price_minor, currency, billing_interval,
                trial_period_days, remote_id, retired, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (catalog_id) DO UPDATE SET
                title = EXCLUDED.title,
                price_minor = EXCLUDED.price_minor,
                currency = EXCLUDED.currency,
                billing_interval = EXCLUDED.billing_interval,
                trial_period_days = EXCLUDED.trial_period_days,
                remote_id = EXCLUDED.remote_id,
                retired = EXCLUDED.retired,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(plan.catalog_id.as_str())
        .bind(&plan.title)
        .bind(plan.price.minor_units())
        .bind(plan.currency.as_str())
        .bind(plan.interval.as_str())
        .bind(i32::try_from(plan.trial_period_days).unwrap_or(i32::MAX))
        .bind(&plan.remote_id)
        .bind(plan.retired)
        .bind(plan.created_at.as_datetime())
        .bind(plan.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save plan: {}", e)))?;

        Ok(())
    }

    async fn find_by_catalog_id(&self, catalog_id: &CatalogId) -> Result<Option<Plan>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(&format!(
            "SELECT {} FROM plans WHERE catalog_id = $1",
            PLAN_COLUMNS
        ))
        .bind(catalog_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find plan: {}", e)))?;

        row.map(Plan::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Plan>, DomainError> {
        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            "SELECT {} FROM plans ORDER BY catalog_id ASC",
            PLAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list plans: {}", e)))?;

        rows.into_iter().map(Plan::try_from).collect()
    }
}

pub struct PostgresCouponRepository {
    pool: PgPool,
}

impl PostgresCouponRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    title: String,
    discount: Json<CouponDiscount>,
    duration: Json<CouponDuration>,
    remote_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Coupon {
            id: CouponId::from_uuid(row.id),
            code: row.code,
            title: row.title,
            discount: row.discount.0,
            duration: row.duration.0,
            remote_id: row.remote_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

const COUPON_COLUMNS: &str =
    "id, code, title, discount, duration, remote_id, created_at, updated_at";

#[async_trait]
impl CouponRepository for PostgresCouponRepository {
    async fn save(&self, coupon: &Coupon) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, title, discount, duration, remote_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                discount = EXCLUDED.discount,
                duration = EXCLUDED.duration,
                remote_id = EXCLUDED.remote_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(coupon.id.as_uuid())
        .bind(&coupon.code)
        .bind(&coupon.title)
        .bind(Json(&coupon.discount))
        .bind(Json(&coupon.duration))
        .bind(&coupon.remote_id)
        .bind(coupon.created_at.as_datetime())
        .bind(coupon.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("coupons_code_key") {
                    return DomainError::validation(
                        "code",
                        format!("Coupon code {} is already in use", coupon.code),
                    );
                }
            }
            DomainError::database(format!("Failed to save coupon: {}", e))
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: &CouponId) -> Result<Option<Coupon>, DomainError> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coupons WHERE id = $1",
            COUPON_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find coupon: {}", e)))?;

        Ok(row.map(Coupon::from))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coupons WHERE LOWER(code) = LOWER($1)",
            COUPON_COLUMNS
        ))
        .bind(code.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find coupon: {}", e)))?;

        Ok(row.map(Coupon::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn plan_row() -> PlanRow {
        PlanRow {
            catalog_id: "gold".to_string(),
            title: "Gold".to_string(),
            price_minor: 1000,
            currency: "usd".to_string(),
            billing_interval: "month".to_string(),
            trial_period_days: 14,
            remote_id: Some("gold".to_string()),
            retired: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn plan_row_converts() {
        let plan = Plan::try_from(plan_row()).unwrap();
        assert_eq!(plan.catalog_id.as_str(), "gold");
        assert_eq!(plan.price.minor_units(), 1000);
        assert_eq!(plan.interval, BillingInterval::Month);
        assert_eq!(plan.trial_period_days, 14);
    }

    #[test]
    fn plan_row_with_unknown_interval_is_a_database_error() {
        let mut row = plan_row();
        row.billing_interval = "fortnight".to_string();
        let err = Plan::try_from(row).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
