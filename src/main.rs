//! Subscription billing service binary.
//!
//! Loads configuration, installs tracing, opens the PostgreSQL pool, applies
//! migrations and serves the billing API.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use subscription_billing::adapters::events::TracingEventPublisher;
use subscription_billing::adapters::http::{self, BillingAppState};
use subscription_billing::adapters::postgres::{
    PostgresContactRepository, PostgresCouponRepository, PostgresEstimateRepository,
    PostgresInvoiceRepository, PostgresPlanRepository, PostgresSubscriptionRecordRepository,
    PostgresWebhookEventRepository,
};
use subscription_billing::adapters::stripe::StripeAdapter;
use subscription_billing::config::{AppConfig, ConfigError, ServerConfig, ValidationError};
use subscription_billing::ports::{RemoteError, WebhookEventRepository};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Stripe client setup failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("Tracing setup failed: {0}")]
    Tracing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        tracing::error!(error = %error, "billing service exited");
        eprintln!("billing service exited: {}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server)?;
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        webhook_signatures = config.payment.webhook_secret.is_some(),
        "configuration loaded"
    );

    let pool = config.database.connect().await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let webhook_events: Arc<dyn WebhookEventRepository> =
        Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    spawn_webhook_pruner(webhook_events.clone(), config.payment.webhook_retention_days);

    let state = BillingAppState {
        remote: Arc::new(StripeAdapter::new(config.payment.stripe_config())?),
        plans: Arc::new(PostgresPlanRepository::new(pool.clone())),
        coupons: Arc::new(PostgresCouponRepository::new(pool.clone())),
        contacts: Arc::new(PostgresContactRepository::new(pool.clone())),
        estimates: Arc::new(PostgresEstimateRepository::new(pool.clone())),
        invoices: Arc::new(PostgresInvoiceRepository::new(pool.clone())),
        records: Arc::new(PostgresSubscriptionRecordRepository::new(pool)),
        webhook_events,
        event_publisher: Arc::new(TracingEventPublisher::new()),
        publishable_key: config.payment.publishable_key.clone(),
        default_currency: config.payment.default_currency()?,
        webhook_verifier: config.payment.webhook_verifier(),
    };

    let app = http::app(
        state,
        config.server.request_timeout(),
        &config.server.cors_origins_list(),
    );

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "billing service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("billing service stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG` overrides
/// the configured filter.
fn init_tracing(server: &ServerConfig) -> Result<(), StartupError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| StartupError::Tracing(e.to_string()))
}

/// Daily sweep of handled webhooks older than the retention window.
fn spawn_webhook_pruner(repo: Arc<dyn WebhookEventRepository>, retention_days: u32) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(24 * 60 * 60));
        loop {
            ticker.tick().await;
            let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(retention_days));
            match repo.delete_before(cutoff).await {
                Ok(removed) => tracing::info!(removed, retention_days, "pruned webhook events"),
                Err(error) => tracing::warn!(error = %error, "webhook event pruning failed"),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "could not install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
