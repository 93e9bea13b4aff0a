//! Plan - a sellable recurring tier mirrored to a remote billing plan.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::foundation::{CatalogId, CurrencyCode, Money, Timestamp, ValidationError};

use super::{BillingInterval, RemoteObjectKind, Subscribable};

/// A recurring plan in the catalog.
///
/// # Invariants
///
/// - `catalog_id` is stable and doubles as the remote plan id
/// - `price` and `interval` are frozen once `remote_id` is set; the
///   processor treats plans as immutable, so a change needs a new plan
/// - plans with subscribers are retired, never deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub catalog_id: CatalogId,
    pub title: String,
    pub price: Money,
    pub currency: CurrencyCode,
    pub interval: BillingInterval,
    pub trial_period_days: u32,
    pub remote_id: Option<String>,
    pub retired: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Plan {
    pub fn new(
        catalog_id: CatalogId,
        title: impl Into<String>,
        price: Money,
        currency: CurrencyCode,
        interval: BillingInterval,
        trial_period_days: u32,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if price.minor_units() < 0 {
            return Err(ValidationError::out_of_range(
                "price",
                0,
                i64::MAX,
                price.minor_units(),
            ));
        }

        let now = Timestamp::now();
        Ok(Self {
            catalog_id,
            title,
            price,
            currency,
            interval,
            trial_period_days,
            remote_id: None,
            retired: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// True once the processor holds a copy of this plan.
    pub fn is_synchronized(&self) -> bool {
        self.remote_id.is_some()
    }

    pub fn has_trial(&self) -> bool {
        self.trial_period_days > 0
    }

    /// End of a billing period that starts at `start`.
    pub fn expiry_from(&self, start: Timestamp) -> Timestamp {
        self.interval.advance(start)
    }

    pub fn rename(&mut self, title: impl Into<String>) -> Result<(), ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        self.title = title;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn reprice(&mut self, price: Money) -> Result<(), ValidationError> {
        if self.is_synchronized() && price != self.price {
            return Err(ValidationError::immutable("price"));
        }
        self.price = price;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn change_interval(&mut self, interval: BillingInterval) -> Result<(), ValidationError> {
        if self.is_synchronized() && interval != self.interval {
            return Err(ValidationError::immutable("interval"));
        }
        self.interval = interval;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn change_currency(&mut self, currency: CurrencyCode) -> Result<(), ValidationError> {
        if self.is_synchronized() && currency != self.currency {
            return Err(ValidationError::immutable("currency"));
        }
        self.currency = currency;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    pub fn change_trial(&mut self, trial_period_days: u32) -> Result<(), ValidationError> {
        if self.is_synchronized() && trial_period_days != self.trial_period_days {
            return Err(ValidationError::immutable("trial_period_days"));
        }
        self.trial_period_days = trial_period_days;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Withdraws the plan from sale; existing subscribers are unaffected.
    pub fn retire(&mut self) {
        self.retired = true;
        self.updated_at = Timestamp::now();
    }
}

impl Subscribable for Plan {
    fn remote_kind(&self) -> RemoteObjectKind {
        RemoteObjectKind::Plan
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, id: String) {
        self.remote_id = Some(id);
    }

    fn create_payload(&self) -> Value {
        json!({
            "id": self.catalog_id.as_str(),
            "currency": self.currency.as_str(),
            "amount": self.price.minor_units(),
            "interval": self.interval.as_str(),
            "trial_period_days": self.trial_period_days,
            "nickname": self.title,
            "product": {
                "id": self.catalog_id.as_str(),
                "name": self.title,
            },
        })
    }

    fn update_payload(&self) -> Value {
        json!({
            "nickname": self.title,
            "active": !self.retired,
        })
    }

    fn idempotency_key(&self) -> String {
        format!("plan-create-{}", self.catalog_id)
    }
}
