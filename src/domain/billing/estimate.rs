//! Estimate - a draft order waiting for payment.
//!
//! An estimate carries the line items and addresses collected during
//! checkout, plus the remote subscription or intent id created for it. Those
//! remote ids are only meaningful until checkout completes and the estimate
//! is consumed into an invoice.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::foundation::{
    CatalogId, ContactId, CurrencyCode, EstimateId, Money, Timestamp, ValidationError,
};

use super::{Contact, Coupon, Plan};

/// What a line item sells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductKind {
    /// A recurring plan, billed through a remote subscription.
    Plan {
        catalog_id: CatalogId,
        remote_price_id: Option<String>,
        #[serde(default)]
        trial_period_days: u32,
    },
    /// A single charge, billed through a payment intent.
    OneOff { sku: String, deliverable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub title: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub product: ProductKind,
}

impl LineItem {
    pub fn for_plan(plan: &Plan, quantity: u32) -> Self {
        Self {
            title: plan.title.clone(),
            quantity,
            unit_price: plan.price,
            product: ProductKind::Plan {
                catalog_id: plan.catalog_id.clone(),
                remote_price_id: plan.remote_id.clone(),
                trial_period_days: plan.trial_period_days,
            },
        }
    }

    pub fn one_off(
        title: impl Into<String>,
        sku: impl Into<String>,
        unit_price: Money,
        quantity: u32,
        deliverable: bool,
    ) -> Result<Self, ValidationError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ValidationError::empty_field("title"));
        }
        if quantity == 0 {
            return Err(ValidationError::out_of_range("quantity", 1, i64::from(u32::MAX), 0));
        }
        Ok(Self {
            title,
            quantity,
            unit_price,
            product: ProductKind::OneOff {
                sku: sku.into(),
                deliverable,
            },
        })
    }

    pub fn total(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// A plan item whose first period is a free trial.
    pub fn starts_in_trial(&self) -> bool {
        matches!(self.product, ProductKind::Plan { trial_period_days, .. } if trial_period_days > 0)
    }

    pub fn plan_catalog_id(&self) -> Option<&CatalogId> {
        match &self.product {
            ProductKind::Plan { catalog_id, .. } => Some(catalog_id),
            ProductKind::OneOff { .. } => None,
        }
    }

    pub fn is_deliverable(&self) -> bool {
        matches!(self.product, ProductKind::OneOff { deliverable: true, .. })
    }
}

/// Why an estimate cannot go to payment yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutBlocker {
    NoItems,
    MissingBillingAddress,
    MissingDeliveryAddress,
}

impl CheckoutBlocker {
    /// Address problems send the customer back to the address step.
    pub fn needs_address(&self) -> bool {
        !matches!(self, CheckoutBlocker::NoItems)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub id: EstimateId,
    pub contact_id: ContactId,
    pub currency: CurrencyCode,
    pub billing_address: Option<String>,
    pub delivery_address: Option<String>,
    pub items: Vec<LineItem>,
    pub coupon: Option<Coupon>,
    pub remote_subscription_id: Option<String>,
    pub remote_intent_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Estimate {
    pub fn new(contact_id: ContactId, currency: CurrencyCode) -> Self {
        let now = Timestamp::now();
        Self {
            id: EstimateId::new(),
            contact_id,
            currency,
            billing_address: None,
            delivery_address: None,
            items: Vec::new(),
            coupon: None,
            remote_subscription_id: None,
            remote_intent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A one-plan estimate for renewing, billed to the contact's default address.
    pub fn for_renewal(contact: &Contact, plan: &Plan) -> Self {
        let mut estimate = Self::new(contact.id, plan.currency.clone());
        estimate.billing_address = contact
            .default_address
            .as_ref()
            .map(|address| address.to_single_line());
        estimate.items.push(LineItem::for_plan(plan, 1));
        estimate
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
        self.updated_at = Timestamp::now();
    }

    pub fn apply_coupon(&mut self, coupon: Coupon) {
        self.coupon = Some(coupon);
        self.updated_at = Timestamp::now();
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::total).sum()
    }

    pub fn discount(&self) -> Money {
        self.coupon
            .as_ref()
            .map(|coupon| coupon.discount_for(self.subtotal()))
            .unwrap_or(Money::ZERO)
    }

    /// Amount payable over a full period, floored at zero.
    pub fn total(&self) -> Money {
        self.subtotal().saturating_sub(self.discount())
    }

    /// Amount charged at checkout. Nothing is due while every plan on the
    /// estimate is in its trial.
    pub fn amount_due_now(&self) -> Money {
        if !self.items.is_empty() && self.items.iter().all(LineItem::starts_in_trial) {
            return Money::ZERO;
        }
        self.total()
    }

    pub fn is_recurring(&self) -> bool {
        self.items.iter().any(|item| item.plan_catalog_id().is_some())
    }

    pub fn is_deliverable(&self) -> bool {
        self.items.iter().any(LineItem::is_deliverable)
    }

    pub fn plan_items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter().filter(|item| item.plan_catalog_id().is_some())
    }

    pub fn check_ready_for_payment(&self) -> Result<(), CheckoutBlocker> {
        if is_blank(self.billing_address.as_deref()) {
            return Err(CheckoutBlocker::MissingBillingAddress);
        }
        if self.is_deliverable() && is_blank(self.delivery_address.as_deref()) {
            return Err(CheckoutBlocker::MissingDeliveryAddress);
        }
        if self.items.is_empty() {
            return Err(CheckoutBlocker::NoItems);
        }
        Ok(())
    }

    /// Create payload for the remote subscription behind this estimate.
    ///
    /// Plan items without a remote price are skipped. A recurring estimate
    /// may not also carry one-off items.
    pub fn subscription_payload(&self, remote_customer_id: &str) -> Result<Value, ValidationError> {
        if self.items.iter().any(|item| item.plan_catalog_id().is_none()) {
            return Err(ValidationError::invalid_format(
                "items",
                "one-off items cannot be combined with a subscription",
            ));
        }

        let items: Vec<Value> = self
            .items
            .iter()
            .filter_map(|item| match &item.product {
                ProductKind::Plan {
                    remote_price_id: Some(price),
                    ..
                } => Some(json!({ "price": price, "quantity": item.quantity })),
                _ => None,
            })
            .collect();
        if items.is_empty() {
            return Err(ValidationError::invalid_format(
                "items",
                "no plan on this estimate is synchronized with the processor",
            ));
        }

        let mut payload = Map::new();
        payload.insert("customer".into(), json!(remote_customer_id));
        payload.insert("items".into(), Value::Array(items));
        payload.insert("payment_behavior".into(), json!("default_incomplete"));
        payload.insert("trial_from_plan".into(), json!(true));
        payload.insert(
            "payment_settings".into(),
            json!({ "save_default_payment_method": "on_subscription" }),
        );
        payload.insert(
            "expand".into(),
            json!(["latest_invoice.payment_intent", "pending_setup_intent"]),
        );
        if let Some(coupon_id) = self.coupon.as_ref().and_then(|c| c.remote_id.as_deref()) {
            payload.insert("coupon".into(), json!(coupon_id));
        }
        payload.insert("metadata".into(), json!({ "estimate_id": self.id.to_string() }));
        Ok(Value::Object(payload))
    }

    /// Create payload for a one-off payment intent.
    pub fn payment_intent_payload(&self, remote_customer_id: &str) -> Value {
        json!({
            "amount": self.total().minor_units(),
            "currency": self.currency.as_str(),
            "customer": remote_customer_id,
            "description": format!("Payment for order {}", self.id),
            "metadata": { "estimate_id": self.id.to_string() },
        })
    }

    pub fn record_remote_subscription(&mut self, remote_subscription_id: impl Into<String>) {
        self.remote_subscription_id = Some(remote_subscription_id.into());
        self.updated_at = Timestamp::now();
    }

    pub fn record_remote_intent(&mut self, remote_intent_id: impl Into<String>) {
        self.remote_intent_id = Some(remote_intent_id.into());
        self.updated_at = Timestamp::now();
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{Address, BillingInterval, CouponDiscount, CouponDuration};
    use crate::domain::foundation::Percentage;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("usd").unwrap()
    }

    fn gold(remote: bool) -> Plan {
        let mut plan = Plan::new(
            CatalogId::new("gold").unwrap(),
            "Gold",
            Money::from_minor(1000),
            usd(),
            BillingInterval::Month,
            0,
        )
        .unwrap();
        if remote {
            plan.remote_id = Some("gold".to_string());
        }
        plan
    }

    fn addressed() -> Estimate {
        let mut estimate = Estimate::new(ContactId::new(), usd());
        estimate.billing_address = Some("1 Main St".to_string());
        estimate
    }

    #[test]
    fn total_subtracts_coupon_and_floors_at_zero() {
        let mut estimate = addressed();
        estimate.add_item(LineItem::for_plan(&gold(true), 2));
        assert_eq!(estimate.subtotal(), Money::from_minor(2000));

        let mut coupon = Coupon::new(
            "ALL",
            "Everything",
            CouponDiscount::PercentOff {
                percent: Percentage::HUNDRED,
            },
            CouponDuration::Once,
        )
        .unwrap();
        coupon.remote_id = Some("co_all".to_string());
        estimate.apply_coupon(coupon);

        assert_eq!(estimate.total(), Money::ZERO);
    }

    #[test]
    fn missing_billing_address_blocks_payment() {
        let mut estimate = Estimate::new(ContactId::new(), usd());
        estimate.add_item(LineItem::for_plan(&gold(true), 1));
        assert_eq!(
            estimate.check_ready_for_payment(),
            Err(CheckoutBlocker::MissingBillingAddress)
        );
    }

    #[test]
    fn deliverable_items_need_delivery_address() {
        let mut estimate = addressed();
        estimate.add_item(LineItem::one_off("Mug", "MUG-1", Money::from_minor(500), 1, true).unwrap());
        assert_eq!(
            estimate.check_ready_for_payment(),
            Err(CheckoutBlocker::MissingDeliveryAddress)
        );

        estimate.delivery_address = Some("2 Side St".to_string());
        assert!(estimate.check_ready_for_payment().is_ok());
    }

    #[test]
    fn empty_estimate_is_not_an_address_problem() {
        let estimate = addressed();
        let blocker = estimate.check_ready_for_payment().unwrap_err();
        assert_eq!(blocker, CheckoutBlocker::NoItems);
        assert!(!blocker.needs_address());
    }

    #[test]
    fn nothing_is_due_now_when_every_plan_starts_in_trial() {
        let mut trial = gold(true);
        trial.trial_period_days = 14;

        let mut estimate = addressed();
        estimate.add_item(LineItem::for_plan(&trial, 1));
        assert_eq!(estimate.total(), Money::from_minor(1000));
        assert_eq!(estimate.amount_due_now(), Money::ZERO);

        estimate.add_item(LineItem::for_plan(&gold(true), 1));
        assert_eq!(estimate.amount_due_now(), estimate.total());
    }

    #[test]
    fn empty_estimate_owes_its_total() {
        let estimate = addressed();
        assert_eq!(estimate.amount_due_now(), estimate.total());
    }

    #[test]
    fn subscription_payload_resolves_remote_prices_and_coupon() {
        let mut estimate = addressed();
        estimate.add_item(LineItem::for_plan(&gold(true), 1));
        let mut coupon = Coupon::new(
            "TEN",
            "Ten",
            CouponDiscount::PercentOff {
                percent: Percentage::try_new(10).unwrap(),
            },
            CouponDuration::Forever,
        )
        .unwrap();
        coupon.remote_id = Some("co_ten".to_string());
        estimate.apply_coupon(coupon);

        let payload = estimate.subscription_payload("cus_1").unwrap();
        assert_eq!(payload["customer"], "cus_1");
        assert_eq!(payload["items"][0]["price"], "gold");
        assert_eq!(payload["items"][0]["quantity"], 1);
        assert_eq!(payload["payment_behavior"], "default_incomplete");
        assert_eq!(payload["expand"][0], "latest_invoice.payment_intent");
        assert_eq!(payload["coupon"], "co_ten");
    }

    #[test]
    fn subscription_payload_skips_unsynced_plans() {
        let mut estimate = addressed();
        estimate.add_item(LineItem::for_plan(&gold(false), 1));
        assert!(estimate.subscription_payload("cus_1").is_err());
    }

    #[test]
    fn mixed_cart_cannot_become_a_subscription() {
        let mut estimate = addressed();
        estimate.add_item(LineItem::for_plan(&gold(true), 1));
        estimate.add_item(LineItem::one_off("Mug", "MUG-1", Money::from_minor(500), 1, false).unwrap());
        assert!(estimate.subscription_payload("cus_1").is_err());
    }

    #[test]
    fn payment_intent_payload_charges_total() {
        let mut estimate = addressed();
        estimate.add_item(LineItem::one_off("Book", "BK-1", Money::from_minor(1250), 2, false).unwrap());
        let payload = estimate.payment_intent_payload("cus_9");
        assert_eq!(payload["amount"], 2500);
        assert_eq!(payload["currency"], "usd");
        assert_eq!(payload["customer"], "cus_9");
    }

    #[test]
    fn renewal_copies_contact_address() {
        let contact = Contact::new("a@example.com", "Ann", "Lee")
            .unwrap()
            .with_address(Address {
                line1: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                postal_code: "62701".to_string(),
                country: "US".to_string(),
                ..Address::default()
            });
        let estimate = Estimate::for_renewal(&contact, &gold(true));

        assert_eq!(estimate.contact_id, contact.id);
        assert_eq!(
            estimate.billing_address.as_deref(),
            Some("1 Main St, Springfield, 62701, US")
        );
        assert!(estimate.is_recurring());
        assert_eq!(estimate.items.len(), 1);
    }
}
