//! Stripe webhook event types.
//!
//! Only the fields the reconciler reads are captured; everything else in
//! Stripe's event schema is ignored.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::SubscriptionStatus;

/// Stripe webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp of creation.
    #[serde(default)]
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// The object the event is about.
    pub object: serde_json::Value,

    /// Values of the fields that changed, before the change (update events only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

/// Event types the reconciler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::Unknown => "unknown",
        }
    }
}

impl StripeEvent {
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }

    /// The subscription carried by the event, if the object is one.
    pub fn subscription(&self) -> Option<StripeSubscription> {
        if self.data.object.get("object").and_then(|o| o.as_str()) != Some("subscription") {
            return None;
        }
        serde_json::from_value(self.data.object.clone()).ok()
    }

    /// `previous_attributes.status`, when the update touched the status.
    ///
    /// Unknown status strings count as absent.
    pub fn previous_status(&self) -> Option<SubscriptionStatus> {
        self.data
            .previous_attributes
            .as_ref()?
            .get("status")?
            .as_str()?
            .parse()
            .ok()
    }
}

/// Stripe subscription object, as embedded in webhook events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Subscription id (sub_...).
    pub id: String,

    pub object: String,

    #[serde(default)]
    pub customer: Option<String>,

    pub status: String,

    /// Period end (Unix timestamp). Newer API versions only set it per item.
    #[serde(default)]
    pub current_period_end: Option<i64>,

    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,

    #[serde(default = "default_quantity")]
    pub quantity: u32,

    #[serde(default)]
    pub current_period_end: Option<i64>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePrice {
    pub id: String,
}

impl StripeSubscription {
    /// Status as a known variant; `None` for statuses we do not model.
    pub fn parsed_status(&self) -> Option<SubscriptionStatus> {
        self.status.parse().ok()
    }

    /// End of the current period, from the subscription or its latest item.
    pub fn period_end(&self) -> Option<Timestamp> {
        self.current_period_end
            .or_else(|| {
                self.items
                    .data
                    .iter()
                    .filter_map(|item| item.current_period_end)
                    .max()
            })
            .and_then(Timestamp::from_unix_secs)
    }
}

/// Builder for creating test StripeEvent instances.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    object: serde_json::Value,
    previous_attributes: Option<serde_json::Value>,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "customer.subscription.updated".to_string(),
            object: serde_json::json!({}),
            previous_attributes: None,
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn previous_attributes(mut self, attrs: serde_json::Value) -> Self {
        self.previous_attributes = Some(attrs);
        self
    }

    pub fn build(self) -> StripeEvent {
        StripeEvent {
            id: self.id,
            event_type: self.event_type,
            created: chrono::Utc::now().timestamp(),
            data: StripeEventData {
                object: self.object,
                previous_attributes: self.previous_attributes,
            },
            livemode: false,
            api_version: Some("2023-10-16".to_string()),
        }
    }
}
