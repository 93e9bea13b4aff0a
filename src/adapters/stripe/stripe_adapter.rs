//! Stripe implementation of the `RemoteObjectClient` port.
//!
//! # Security
//!
//! - The secret key is held as `secrecy::SecretString` and only exposed to
//!   build the basic-auth header
//! - Creates carry an `Idempotency-Key` header so a repeated create returns
//!   the first object

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::form;
use crate::ports::{RemoteError, RemoteObject, RemoteObjectClient, RemoteObjectKind};

/// Default Stripe API host.
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Default per-request deadline.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Stripe adapter for the processor object API.
pub struct StripeAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeAdapter {
    /// Builds the adapter.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` if the secret key is empty
    pub fn new(config: StripeConfig) -> Result<Self, RemoteError> {
        if config.secret_key.expose_secret().trim().is_empty() {
            return Err(RemoteError::missing_credentials());
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn collection_url(&self, kind: RemoteObjectKind) -> String {
        format!("{}/v1/{}", self.config.api_base_url, kind.resource_path())
    }

    fn object_url(&self, kind: RemoteObjectKind, id: &str) -> String {
        format!("{}/{}", self.collection_url(kind), id)
    }

    /// Sends a request and returns the JSON body of a 2xx answer.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        kind: RemoteObjectKind,
        id: Option<&str>,
    ) -> Result<Value, RemoteError> {
        let response = request
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(kind = %kind, error = %e, "Stripe request failed to complete");
                if e.is_timeout() {
                    RemoteError::network(format!("Stripe request timed out: {}", e))
                } else {
                    RemoteError::network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = error_for_status(status, &body, kind, id.unwrap_or_default());
            tracing::warn!(
                kind = %kind,
                status = status.as_u16(),
                code = %err.code,
                provider_code = ?err.provider_code,
                "Stripe API error"
            );
            return Err(err);
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::invalid_response(format!("failed to parse Stripe response: {}", e)))
    }
}

/// Maps a non-2xx answer to a `RemoteError`.
fn error_for_status(status: StatusCode, body: &str, kind: RemoteObjectKind, id: &str) -> RemoteError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Stripe API error ({})", status.as_u16()));
    let provider_code = error.and_then(|e| e.get("code")).and_then(Value::as_str);

    let err = match status {
        StatusCode::NOT_FOUND => RemoteError::not_found(kind, id),
        StatusCode::UNAUTHORIZED => RemoteError::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => RemoteError::rate_limited(message),
        _ => RemoteError::provider(message),
    };

    match provider_code {
        Some(code) => err.with_provider_code(code),
        None => err,
    }
}

#[async_trait]
impl RemoteObjectClient for StripeAdapter {
    async fn create_or_update(
        &self,
        kind: RemoteObjectKind,
        payload: &Value,
        existing_id: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<RemoteObject, RemoteError> {
        let params = form::encode(payload, existing_id.is_some());

        let request = match existing_id {
            Some(id) => self.http_client.post(self.object_url(kind, id)).form(&params),
            None => {
                let mut request = self.http_client.post(self.collection_url(kind)).form(&params);
                if let Some(key) = idempotency_key {
                    request = request.header("Idempotency-Key", key);
                }
                request
            }
        };

        let body = self.send(request, kind, existing_id).await?;
        let object = RemoteObject::from_body(kind, body)?;

        tracing::info!(
            kind = %kind,
            remote_id = %object.id,
            updated = existing_id.is_some(),
            "Stripe object saved"
        );
        Ok(object)
    }

    async fn retrieve(
        &self,
        kind: RemoteObjectKind,
        id: &str,
        expand: &[&str],
    ) -> Result<RemoteObject, RemoteError> {
        let request = self
            .http_client
            .get(self.object_url(kind, id))
            .query(&form::expand_params(expand));

        let body = self.send(request, kind, Some(id)).await?;
        RemoteObject::from_body(kind, body)
    }

    async fn delete(&self, kind: RemoteObjectKind, id: &str) -> Result<RemoteObject, RemoteError> {
        let request = match kind {
            RemoteObjectKind::PaymentMethod => self
                .http_client
                .post(format!("{}/detach", self.object_url(kind, id))),
            RemoteObjectKind::PaymentIntent | RemoteObjectKind::SetupIntent => self
                .http_client
                .post(format!("{}/cancel", self.object_url(kind, id))),
            _ => self.http_client.request(Method::DELETE, self.object_url(kind, id)),
        };

        let body = self.send(request, kind, Some(id)).await?;
        tracing::info!(kind = %kind, remote_id = %id, "Stripe object removed");
        RemoteObject::from_body(kind, body)
    }

    async fn list(
        &self,
        kind: RemoteObjectKind,
        filters: &[(&str, &str)],
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let request = self.http_client.get(self.collection_url(kind)).query(filters);
        let body = self.send(request, kind, None).await?;

        let data = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| RemoteError::invalid_response(format!("{} list has no data", kind)))?;

        data.iter()
            .cloned()
            .map(|item| RemoteObject::from_body(kind, item))
            .collect()
    }
}
