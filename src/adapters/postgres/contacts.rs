//! PostgreSQL implementations of ContactRepository and EstimateRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Address, Contact, Coupon, Estimate, LineItem};
use crate::domain::foundation::{ContactId, CurrencyCode, DomainError, EstimateId, Timestamp};
use crate::ports::{ContactRepository, EstimateRepository};

use super::row_error;

pub struct PostgresContactRepository {
    pool: PgPool,
}

impl PostgresContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: Uuid,
    email: String,
    first_name: String,
    surname: String,
    default_address: Option<Json<Address>>,
    remote_customer_id: Option<String>,
    front_end_user: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: ContactId::from_uuid(row.id),
            email: row.email,
            first_name: row.first_name,
            surname: row.surname,
            default_address: row.default_address.map(|a| a.0),
            remote_customer_id: row.remote_customer_id,
            front_end_user: row.front_end_user,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

#[async_trait]
impl ContactRepository for PostgresContactRepository {
    async fn save(&self, contact: &Contact) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO contacts (
                id, email, first_name, surname, default_address,
                remote_customer_id, front_end_user, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                first_name = EXCLUDED.first_name,
                surname = EXCLUDED.surname,
                default_address = EXCLUDED.default_address,
                remote_customer_id = COALESCE(contacts.remote_customer_id, EXCLUDED.remote_customer_id),
                front_end_user = EXCLUDED.front_end_user,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(contact.id.as_uuid())
        .bind(&contact.email)
        .bind(&contact.first_name)
        .bind(&contact.surname)
        .bind(contact.default_address.as_ref().map(Json))
        .bind(&contact.remote_customer_id)
        .bind(contact.front_end_user)
        .bind(contact.created_at.as_datetime())
        .bind(contact.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save contact: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, DomainError> {
        let row: Option<ContactRow> = sqlx::query_as(
            r#"
            SELECT id, email, first_name, surname, default_address,
                   remote_customer_id, front_end_user, created_at, updated_at
            FROM contacts
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find contact: {}", e)))?;

        Ok(row.map(Contact::from))
    }

    async fn delete(&self, id: &ContactId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete contact: {}", e)))?;

        Ok(())
    }
}

pub struct PostgresEstimateRepository {
    pool: PgPool,
}

impl PostgresEstimateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EstimateRow {
    id: Uuid,
    contact_id: Uuid,
    currency: String,
    billing_address: Option<String>,
    delivery_address: Option<String>,
    items: Json<Vec<LineItem>>,
    coupon: Option<Json<Coupon>>,
    remote_subscription_id: Option<String>,
    remote_intent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EstimateRow> for Estimate {
    type Error = DomainError;

    fn try_from(row: EstimateRow) -> Result<Self, Self::Error> {
        Ok(Estimate {
            id: EstimateId::from_uuid(row.id),
            contact_id: ContactId::from_uuid(row.contact_id),
            currency: CurrencyCode::new(&row.currency).map_err(row_error("currency"))?,
            billing_address: row.billing_address,
            delivery_address: row.delivery_address,
            items: row.items.0,
            coupon: row.coupon.map(|c| c.0),
            remote_subscription_id: row.remote_subscription_id,
            remote_intent_id: row.remote_intent_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl EstimateRepository for PostgresEstimateRepository {
    async fn save(&self, estimate: &Estimate) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO estimates (
                id, contact_id, currency, billing_address, delivery_address, items,
                coupon, remote_subscription_id, remote_intent_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                currency = EXCLUDED.currency,
                billing_address = EXCLUDED.billing_address,
                delivery_address = EXCLUDED.delivery_address,
                items = EXCLUDED.items,
                coupon = EXCLUDED.coupon,
                remote_subscription_id = EXCLUDED.remote_subscription_id,
                remote_intent_id = EXCLUDED.remote_intent_id,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(estimate.id.as_uuid())
        .bind(estimate.contact_id.as_uuid())
        .bind(estimate.currency.as_str())
        .bind(&estimate.billing_address)
        .bind(&estimate.delivery_address)
        .bind(Json(&estimate.items))
        .bind(estimate.coupon.as_ref().map(Json))
        .bind(&estimate.remote_subscription_id)
        .bind(&estimate.remote_intent_id)
        .bind(estimate.created_at.as_datetime())
        .bind(estimate.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save estimate: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &EstimateId) -> Result<Option<Estimate>, DomainError> {
        let row: Option<EstimateRow> = sqlx::query_as(
            r#"
            SELECT id, contact_id, currency, billing_address, delivery_address, items,
                   coupon, remote_subscription_id, remote_intent_id, created_at, updated_at
            FROM estimates
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find estimate: {}", e)))?;

        row.map(Estimate::try_from).transpose()
    }

    async fn delete(&self, id: &EstimateId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM estimates WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete estimate: {}", e)))?;

        Ok(())
    }
}
