//! Capability contract for local records mirrored into the payment processor.
//!
//! A plan, a coupon or a contact each implement [`Subscribable`]. The sync
//! routine in the application layer pushes the record's full state on every
//! local write: a create the first time (keyed for idempotency), an update
//! with the stored remote id afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kinds of object the payment processor stores for us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteObjectKind {
    Customer,
    PaymentMethod,
    SetupIntent,
    PaymentIntent,
    Subscription,
    Plan,
    Coupon,
}

impl RemoteObjectKind {
    /// The processor's `object` discriminator for this kind.
    pub fn object_name(&self) -> &'static str {
        match self {
            RemoteObjectKind::Customer => "customer",
            RemoteObjectKind::PaymentMethod => "payment_method",
            RemoteObjectKind::SetupIntent => "setup_intent",
            RemoteObjectKind::PaymentIntent => "payment_intent",
            RemoteObjectKind::Subscription => "subscription",
            RemoteObjectKind::Plan => "plan",
            RemoteObjectKind::Coupon => "coupon",
        }
    }

    /// Collection path segment under `/v1/`.
    pub fn resource_path(&self) -> &'static str {
        match self {
            RemoteObjectKind::Customer => "customers",
            RemoteObjectKind::PaymentMethod => "payment_methods",
            RemoteObjectKind::SetupIntent => "setup_intents",
            RemoteObjectKind::PaymentIntent => "payment_intents",
            RemoteObjectKind::Subscription => "subscriptions",
            RemoteObjectKind::Plan => "plans",
            RemoteObjectKind::Coupon => "coupons",
        }
    }
}

impl fmt::Display for RemoteObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_name())
    }
}

/// A local record that owns a remote twin.
pub trait Subscribable {
    /// Which processor object this record maps to.
    fn remote_kind(&self) -> RemoteObjectKind;

    /// The remote id, once assigned.
    fn remote_id(&self) -> Option<&str>;

    /// Stores the id the processor assigned on create.
    fn set_remote_id(&mut self, id: String);

    /// Full payload for the first push.
    fn create_payload(&self) -> Value;

    /// Payload for every later push. Only fields the processor allows to change.
    fn update_payload(&self) -> Value;

    /// Deterministic key sent with the create call.
    ///
    /// Two creates for the same local entity resolve to one remote object,
    /// even if the first id never made it to storage.
    fn idempotency_key(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_names_match_processor_discriminators() {
        assert_eq!(RemoteObjectKind::Subscription.object_name(), "subscription");
        assert_eq!(RemoteObjectKind::PaymentIntent.object_name(), "payment_intent");
        assert_eq!(RemoteObjectKind::SetupIntent.to_string(), "setup_intent");
    }

    #[test]
    fn resource_paths_are_plural() {
        assert_eq!(RemoteObjectKind::Customer.resource_path(), "customers");
        assert_eq!(RemoteObjectKind::PaymentMethod.resource_path(), "payment_methods");
        assert_eq!(RemoteObjectKind::Coupon.resource_path(), "coupons");
    }
}
