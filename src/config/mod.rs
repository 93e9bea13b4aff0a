//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables with the
//! `config` and `dotenvy` crates. Variables carry the `BILLING` prefix and
//! nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use subscription_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment processor configuration (Stripe)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `BILLING__PAYMENT__SECRET_KEY=sk_test_...` -> `payment.secret_key`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("BILLING")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[(&str, &str)] = &[
        ("BILLING__DATABASE__URL", "postgresql://billing@localhost/billing"),
        ("BILLING__PAYMENT__SECRET_KEY", "sk_test_xxx"),
        ("BILLING__PAYMENT__PUBLISHABLE_KEY", "pk_test_xxx"),
        ("BILLING__PAYMENT__WEBHOOK_SECRET", "whsec_xxx"),
    ];

    fn set_minimal_env() {
        for (key, value) in VARS {
            env::set_var(key, value);
        }
    }

    fn clear_env() {
        for (key, _) in VARS {
            env::remove_var(key);
        }
        env::remove_var("BILLING__SERVER__PORT");
        env::remove_var("BILLING__SERVER__ENVIRONMENT");
        env::remove_var("BILLING__PAYMENT__CURRENCY");
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.database.url, "postgresql://billing@localhost/billing");
        assert_eq!(config.payment.publishable_key, "pk_test_xxx");
        assert_eq!(config.payment.webhook_secret.as_deref(), Some("whsec_xxx"));
        assert_eq!(config.payment.currency, "usd");
    }

    #[test]
    fn test_validate_full_config() {
        let config = load_with(&[]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_overrides() {
        let config = load_with(&[
            ("BILLING__SERVER__ENVIRONMENT", "production"),
            ("BILLING__SERVER__PORT", "3000"),
            ("BILLING__PAYMENT__CURRENCY", "eur"),
        ])
        .unwrap();
        assert!(config.is_production());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.payment.default_currency().unwrap().as_str(), "eur");
    }

    #[test]
    fn test_missing_payment_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("BILLING__DATABASE__URL", "postgresql://billing@localhost/billing");
        let result = AppConfig::load();
        clear_env();

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
