//! Coupon - a discount mirrored into the payment processor.
//!
//! The processor forbids editing discount terms after creation, so only the
//! name travels on update. Changing the amount or duration of a synced coupon
//! is rejected locally before any remote call.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::foundation::{CouponId, CurrencyCode, Money, Percentage, Timestamp, ValidationError};

use super::{RemoteObjectKind, Subscribable};

/// What the coupon takes off the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponDiscount {
    AmountOff { amount: Money, currency: CurrencyCode },
    PercentOff { percent: Percentage },
}

impl CouponDiscount {
    /// Discount applied to `subtotal`, never more than the subtotal itself.
    pub fn applied_to(&self, subtotal: Money) -> Money {
        let discount = match self {
            CouponDiscount::AmountOff { amount, .. } => *amount,
            CouponDiscount::PercentOff { percent } => percent.of(subtotal),
        };
        discount.min(subtotal).max(Money::ZERO)
    }
}

/// How long the discount applies to a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouponDuration {
    Once,
    Forever,
    Repeating { months: u32 },
}

impl CouponDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponDuration::Once => "once",
            CouponDuration::Forever => "forever",
            CouponDuration::Repeating { .. } => "repeating",
        }
    }
}

/// A discount that customers redeem at checkout by `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub title: String,
    pub discount: CouponDiscount,
    pub duration: CouponDuration,
    pub remote_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Coupon {
    pub fn new(
        code: impl Into<String>,
        title: impl Into<String>,
        discount: CouponDiscount,
        duration: CouponDuration,
    ) -> Result<Self, ValidationError> {
        let code = code.into().trim().to_uppercase();
        if code.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        Self::check_terms(&discount, &duration)?;

        let now = Timestamp::now();
        Ok(Self {
            id: CouponId::new(),
            code,
            title,
            discount,
            duration,
            remote_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_synchronized(&self) -> bool {
        self.remote_id.is_some()
    }

    /// True if `code` redeems this coupon. Case-insensitive.
    pub fn matches_code(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code.trim())
    }

    pub fn discount_for(&self, subtotal: Money) -> Money {
        self.discount.applied_to(subtotal)
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

    pub fn change_terms(
        &mut self,
        discount: CouponDiscount,
        duration: CouponDuration,
    ) -> Result<(), ValidationError> {
        if self.is_synchronized() {
            if discount != self.discount {
                return Err(ValidationError::immutable("discount"));
            }
            if duration != self.duration {
                return Err(ValidationError::immutable("duration"));
            }
        }
        Self::check_terms(&discount, &duration)?;
        self.discount = discount;
        self.duration = duration;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    fn check_terms(discount: &CouponDiscount, duration: &CouponDuration) -> Result<(), ValidationError> {
        if let CouponDiscount::AmountOff { amount, .. } = discount {
            if amount.minor_units() <= 0 {
                return Err(ValidationError::out_of_range(
                    "amount_off",
                    1,
                    i64::MAX,
                    amount.minor_units(),
                ));
            }
        }
        if let CouponDuration::Repeating { months } = duration {
            if *months == 0 {
                return Err(ValidationError::out_of_range("duration_in_months", 1, 120, 0));
            }
        }
        Ok(())
    }
}

impl Subscribable for Coupon {
    fn remote_kind(&self) -> RemoteObjectKind {
        RemoteObjectKind::Coupon
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    fn set_remote_id(&mut self, id: String) {
        self.remote_id = Some(id);
    }

    fn create_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("name".into(), json!(self.title));
        match &self.discount {
            CouponDiscount::AmountOff { amount, currency } => {
                payload.insert("amount_off".into(), json!(amount.minor_units()));
                payload.insert("currency".into(), json!(currency.as_str()));
            }
            CouponDiscount::PercentOff { percent } => {
                payload.insert("percent_off".into(), json!(percent.value()));
            }
        }
        payload.insert("duration".into(), json!(self.duration.as_str()));
        if let CouponDuration::Repeating { months } = self.duration {
            payload.insert("duration_in_months".into(), json!(months));
        }
        payload.insert("metadata".into(), json!({ "coupon_id": self.id.to_string() }));
        Value::Object(payload)
    }

    fn update_payload(&self) -> Value {
        json!({ "name": self.title })
    }

    fn idempotency_key(&self) -> String {
        format!("coupon-create-{}", self.id)
    }
}
