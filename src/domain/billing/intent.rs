//! Which processor intent the client confirms at checkout.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::subscribable::RemoteObjectKind;
use crate::domain::foundation::ValidationError;

/// Tag handed to the client alongside the client secret.
///
/// A paid first period confirms a payment intent; a trial only collects a
/// card through a setup intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Payment,
    Setup,
}

impl IntentType {
    pub fn remote_kind(&self) -> RemoteObjectKind {
        match self {
            IntentType::Payment => RemoteObjectKind::PaymentIntent,
            IntentType::Setup => RemoteObjectKind::SetupIntent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentType::Payment => "payment",
            IntentType::Setup => "setup",
        }
    }
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "payment" => Ok(IntentType::Payment),
            "setup" => Ok(IntentType::Setup),
            other => Err(ValidationError::invalid_format(
                "intent",
                format!("expected 'payment' or 'setup', got '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_and_map_to_remote_kinds() {
        assert_eq!("payment".parse::<IntentType>().unwrap(), IntentType::Payment);
        assert_eq!("setup".parse::<IntentType>().unwrap(), IntentType::Setup);
        assert_eq!(IntentType::Payment.remote_kind(), RemoteObjectKind::PaymentIntent);
        assert_eq!(IntentType::Setup.remote_kind(), RemoteObjectKind::SetupIntent);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "card".parse::<IntentType>().unwrap_err();
        assert_eq!(err.field(), "intent");
    }
}
