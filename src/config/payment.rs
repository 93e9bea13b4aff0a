//! Payment configuration

use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::adapters::stripe::{StripeConfig, DEFAULT_API_BASE_URL};
use crate::domain::billing::StripeWebhookVerifier;
use crate::domain::foundation::CurrencyCode;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub secret_key: String,

    /// Stripe publishable key handed to the browser
    pub publishable_key: String,

    /// Webhook signing secret. Unsigned deliveries are accepted when unset.
    pub webhook_secret: Option<String>,

    /// Currency for plans saved without one
    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Stripe request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Days a handled webhook stays in the duplicate guard
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: u32,
}

impl fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("secret_key", &"[REDACTED]")
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("currency", &self.currency)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("webhook_retention_days", &self.webhook_retention_days)
            .finish()
    }
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.starts_with("sk_live_")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settings for the Stripe REST client.
    pub fn stripe_config(&self) -> StripeConfig {
        StripeConfig::new(SecretString::new(self.secret_key.clone()))
            .with_base_url(&self.api_base_url)
            .with_timeout(self.timeout())
    }

    /// Signature verifier, when a signing secret is configured.
    pub fn webhook_verifier(&self) -> Option<StripeWebhookVerifier> {
        self.webhook_secret
            .as_ref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| StripeWebhookVerifier::new(SecretString::new(s.clone())))
    }

    pub fn default_currency(&self) -> Result<CurrencyCode, ValidationError> {
        CurrencyCode::new(&self.currency)
            .map_err(|_| ValidationError::InvalidCurrency(self.currency.clone()))
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__SECRET_KEY"));
        }
        if self.publishable_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__PUBLISHABLE_KEY"));
        }

        // Verify key prefixes for safety
        if !self.secret_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.publishable_key.starts_with("pk_") {
            return Err(ValidationError::InvalidPublishableKey);
        }
        if self.is_test_mode() != self.publishable_key.starts_with("pk_test_") {
            return Err(ValidationError::StripeModeMismatch);
        }
        if let Some(secret) = &self.webhook_secret {
            if !secret.is_empty() && !secret.starts_with("whsec_") {
                return Err(ValidationError::InvalidStripeWebhookSecret);
            }
        }

        self.default_currency()?;
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://")
        {
            return Err(ValidationError::InvalidApiBaseUrl);
        }
        if self.timeout_secs == 0 || self.timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.webhook_retention_days == 0 {
            return Err(ValidationError::InvalidRetention);
        }

        Ok(())
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_webhook_retention_days() -> u32 {
    90
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PaymentConfig {
        PaymentConfig {
            secret_key: "sk_test_abcd1234".to_string(),
            publishable_key: "pk_test_abcd1234".to_string(),
            webhook_secret: Some("whsec_xyz789".to_string()),
            currency: default_currency(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout(),
            webhook_retention_days: default_webhook_retention_days(),
        }
    }

    #[test]
    fn test_is_test_mode() {
        let config = test_config();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validation_missing_keys() {
        let config = PaymentConfig {
            secret_key: String::new(),
            ..test_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));

        let config = PaymentConfig {
            publishable_key: String::new(),
            ..test_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_validation_key_prefixes() {
        let config = PaymentConfig {
            secret_key: "pk_test_xxx".to_string(),
            ..test_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));

        let config = PaymentConfig {
            publishable_key: "sk_test_xxx".to_string(),
            ..test_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidPublishableKey));
    }

    #[test]
    fn test_validation_mode_mismatch() {
        let config = PaymentConfig {
            publishable_key: "pk_live_xxx".to_string(),
            ..test_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::StripeModeMismatch));
    }

    #[test]
    fn test_webhook_secret_is_optional() {
        let config = PaymentConfig {
            webhook_secret: None,
            ..test_config()
        };
        assert!(config.validate().is_ok());
        assert!(config.webhook_verifier().is_none());
        assert!(test_config().webhook_verifier().is_some());
    }

    #[test]
    fn test_validation_webhook_secret_prefix() {
        let config = PaymentConfig {
            webhook_secret: Some("secret_xxx".to_string()),
            ..test_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_currency() {
        let config = PaymentConfig {
            currency: "dollars".to_string(),
            ..test_config()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidCurrency("dollars".to_string()))
        );
        assert_eq!(test_config().default_currency().unwrap().as_str(), "usd");
    }

    #[test]
    fn test_validation_retention() {
        let config = PaymentConfig {
            webhook_retention_days: 0,
            ..test_config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidRetention));
    }

    #[test]
    fn test_stripe_config_uses_base_url() {
        let config = PaymentConfig {
            api_base_url: "http://localhost:12111/".to_string(),
            ..test_config()
        };
        assert_eq!(config.stripe_config().api_base_url(), "http://localhost:12111");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("sk_test_abcd1234"));
        assert!(!rendered.contains("whsec_xyz789"));
        assert!(rendered.contains("pk_test_abcd1234"));
    }
}
