//! PostgreSQL implementations of SubscriptionRecordRepository and InvoiceRepository.
//!
//! `subscription_records.remote_subscription_id` is UNIQUE: when checkout
//! completion and a webhook race to track the same subscription, the loser
//! gets `SubscriptionExists` and re-reads the winner's row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    Invoice, InvoiceStatus, LineItem, SubscriptionRecord, SubscriptionStatus,
};
use crate::domain::foundation::{
    CatalogId, ContactId, CurrencyCode, DomainError, ErrorCode, EstimateId, InvoiceId, Money,
    SubscriptionRecordId, Timestamp,
};
use crate::ports::{InvoiceRepository, SubscriptionRecordRepository};

use super::row_error;

const REMOTE_SUBSCRIPTION_KEY: &str = "subscription_records_remote_subscription_id_key";

pub struct PostgresSubscriptionRecordRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRecordRow {
    id: Uuid,
    contact_id: Uuid,
    plan_id: String,
    status: String,
    expires_at: DateTime<Utc>,
    remote_subscription_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRecordRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRecordRow) -> Result<Self, Self::Error> {
        Ok(SubscriptionRecord {
            id: SubscriptionRecordId::from_uuid(row.id),
            contact_id: ContactId::from_uuid(row.contact_id),
            plan_id: CatalogId::new(row.plan_id).map_err(row_error("plan_id"))?,
            status: row
                .status
                .parse::<SubscriptionStatus>()
                .map_err(row_error("status"))?,
            expires_at: Timestamp::from_datetime(row.expires_at),
            remote_subscription_id: row.remote_subscription_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const RECORD_COLUMNS: &str =
    "id, contact_id, plan_id, status, expires_at, remote_subscription_id, created_at, updated_at";

#[async_trait]
impl SubscriptionRecordRepository for PostgresSubscriptionRecordRepository {
    async fn save(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_records (
                id, contact_id, plan_id, status, expires_at,
                remote_subscription_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.contact_id.as_uuid())
        .bind(record.plan_id.as_str())
        .bind(record.status.as_str())
        .bind(record.expires_at.as_datetime())
        .bind(&record.remote_subscription_id)
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(REMOTE_SUBSCRIPTION_KEY) {
                    return DomainError::new(
                        ErrorCode::SubscriptionExists,
                        format!(
                            "subscription {} is already tracked",
                            record.remote_subscription_id
                        ),
                    );
                }
            }
            DomainError::database(format!("Failed to save subscription record: {}", e))
        })?;

        Ok(())
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscription_records SET
                plan_id = $2,
                status = $3,
                expires_at = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.plan_id.as_str())
        .bind(record.status.as_str())
        .bind(record.expires_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription record: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("subscription record {} not found", record.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &SubscriptionRecordId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription record: {}", e)))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records WHERE remote_subscription_id = $1",
            RECORD_COLUMNS
        ))
        .bind(remote_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find subscription record: {}", e)))?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn find_by_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Vec<SubscriptionRecord>, DomainError> {
        let rows: Vec<SubscriptionRecordRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_records WHERE contact_id = $1 ORDER BY created_at ASC",
            RECORD_COLUMNS
        ))
        .bind(contact_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list subscription records: {}", e)))?;

        rows.into_iter().map(SubscriptionRecord::try_from).collect()
    }

    async fn delete(&self, id: &SubscriptionRecordId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM subscription_records WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete subscription record: {}", e)))?;

        Ok(())
    }
}

pub struct PostgresInvoiceRepository {
    pool: PgPool,
}

impl PostgresInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    contact_id: Uuid,
    estimate_id: Option<Uuid>,
    currency: String,
    items: Json<Vec<LineItem>>,
    total_minor: i64,
    status: String,
    remote_subscription_id: Option<String>,
    subscription_record_id: Option<Uuid>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            contact_id: ContactId::from_uuid(row.contact_id),
            estimate_id: row.estimate_id.map(EstimateId::from_uuid),
            currency: CurrencyCode::new(&row.currency).map_err(row_error("currency"))?,
            items: row.items.0,
            total: Money::from_minor(row.total_minor),
            status: row.status.parse::<InvoiceStatus>().map_err(row_error("status"))?,
            remote_subscription_id: row.remote_subscription_id,
            subscription_record_id: row.subscription_record_id.map(SubscriptionRecordId::from_uuid),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

const INVOICE_COLUMNS: &str = "id, contact_id, estimate_id, currency, items, total_minor, status, \
     remote_subscription_id, subscription_record_id, paid_at, created_at, updated_at";

#[async_trait]
impl InvoiceRepository for PostgresInvoiceRepository {
    async fn save(&self, invoice: &Invoice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, contact_id, estimate_id, currency, items, total_minor, status,
                remote_subscription_id, subscription_record_id, paid_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(invoice.contact_id.as_uuid())
        .bind(invoice.estimate_id.map(|id| *id.as_uuid()))
        .bind(invoice.currency.as_str())
        .bind(Json(&invoice.items))
        .bind(invoice.total.minor_units())
        .bind(invoice.status.as_str())
        .bind(&invoice.remote_subscription_id)
        .bind(invoice.subscription_record_id.map(|id| *id.as_uuid()))
        .bind(invoice.paid_at.map(|t| *t.as_datetime()))
        .bind(invoice.created_at.as_datetime())
        .bind(invoice.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return DomainError::new(
                        ErrorCode::InvoiceExists,
                        format!("invoice {} already exists", invoice.id),
                    );
                }
            }
            DomainError::database(format!("Failed to save invoice: {}", e))
        })?;

        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                items = $2,
                total_minor = $3,
                status = $4,
                remote_subscription_id = $5,
                subscription_record_id = $6,
                paid_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(Json(&invoice.items))
        .bind(invoice.total.minor_units())
        .bind(invoice.status.as_str())
        .bind(&invoice.remote_subscription_id)
        .bind(invoice.subscription_record_id.map(|id| *id.as_uuid()))
        .bind(invoice.paid_at.map(|t| *t.as_datetime()))
        .bind(invoice.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update invoice: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::InvoiceNotFound,
                format!("invoice {} not found", invoice.id),
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &InvoiceId) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find invoice: {}", e)))?;

        row.map(Invoice::try_from).transpose()
    }

    async fn find_by_remote_subscription_id(
        &self,
        remote_subscription_id: &str,
    ) -> Result<Option<Invoice>, DomainError> {
        // Oldest first: the checkout invoice wins over any later synthesized one.
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE remote_subscription_id = $1 ORDER BY created_at ASC LIMIT 1",
            INVOICE_COLUMNS
        ))
        .bind(remote_subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find invoice: {}", e)))?;

        row.map(Invoice::try_from).transpose()
    }

    async fn find_by_estimate_id(&self, estimate_id: &EstimateId) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM invoices WHERE estimate_id = $1",
            INVOICE_COLUMNS
        ))
        .bind(estimate_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find invoice: {}", e)))?;

        row.map(Invoice::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_row(status: &str) -> SubscriptionRecordRow {
        SubscriptionRecordRow {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            plan_id: "gold".to_string(),
            status: status.to_string(),
            expires_at: Utc::now(),
            remote_subscription_id: "sub_1".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn record_row_parses_every_stored_status() {
        for status in SubscriptionStatus::ALL {
            let record = SubscriptionRecord::try_from(record_row(status.as_str())).unwrap();
            assert_eq!(record.status, status);
        }
    }

    #[test]
    fn record_row_with_unknown_status_is_rejected() {
        let err = SubscriptionRecord::try_from(record_row("paused")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn invoice_row_converts() {
        let record_id = Uuid::new_v4();
        let row = InvoiceRow {
            id: Uuid::new_v4(),
            contact_id: Uuid::new_v4(),
            estimate_id: None,
            currency: "usd".to_string(),
            items: Json(Vec::new()),
            total_minor: 1000,
            status: "failed".to_string(),
            remote_subscription_id: Some("sub_1".to_string()),
            subscription_record_id: Some(record_id),
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let invoice = Invoice::try_from(row).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Failed);
        assert_eq!(invoice.total.minor_units(), 1000);
        assert_eq!(
            invoice.subscription_record_id,
            Some(SubscriptionRecordId::from_uuid(record_id))
        );
    }
}
