//! Remote object client port - create-or-update access to the payment processor.
//!
//! The processor stores customers, payment methods, intents, subscriptions,
//! plans and coupons. This port hides the HTTP details behind four calls and
//! hands back the raw JSON body, since handlers read different fields from
//! each object kind.
//!
//! # Design
//!
//! - **Explicit credentials**: implementations receive their secret key at
//!   construction and fail with `MissingCredentials` when it is empty
//! - **No retries**: transient failures surface to the caller with `retryable`
//!   set, and the caller decides
//! - **Idempotent creates**: a create carries a caller-derived key so a
//!   repeated create returns the first object

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::billing::{BillingError, RemoteObjectKind};

/// An object as returned by the processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub kind: RemoteObjectKind,
    pub id: String,
    pub body: Value,
}

impl RemoteObject {
    pub fn new(kind: RemoteObjectKind, id: impl Into<String>, body: Value) -> Self {
        Self {
            kind,
            id: id.into(),
            body,
        }
    }

    /// Wraps a response body, which must carry a string `id`.
    pub fn from_body(kind: RemoteObjectKind, body: Value) -> Result<Self, RemoteError> {
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                RemoteError::invalid_response(format!("{} response has no id", kind))
            })?
            .to_string();
        Ok(Self { kind, id, body })
    }

    /// Looks up a dotted path such as `latest_invoice.payment_intent.client_secret`.
    pub fn field(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.body, |value, key| value.get(key))
            .filter(|value| !value.is_null())
    }

    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    pub fn i64_field(&self, path: &str) -> Option<i64> {
        self.field(path).and_then(Value::as_i64)
    }

    pub fn status(&self) -> Option<&str> {
        self.str_field("status")
    }
}

/// Port for the payment processor's object API.
#[async_trait]
pub trait RemoteObjectClient: Send + Sync {
    /// Creates the object when `existing_id` is `None`, updates it otherwise.
    ///
    /// `idempotency_key` is only sent on creates.
    async fn create_or_update(
        &self,
        kind: RemoteObjectKind,
        payload: &Value,
        existing_id: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<RemoteObject, RemoteError>;

    /// Fetches one object, expanding the listed nested references.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the processor does not know the id
    async fn retrieve(
        &self,
        kind: RemoteObjectKind,
        id: &str,
        expand: &[&str],
    ) -> Result<RemoteObject, RemoteError>;

    /// Removes the object: cancels a subscription, detaches a payment method,
    /// deletes anything else.
    async fn delete(&self, kind: RemoteObjectKind, id: &str) -> Result<RemoteObject, RemoteError>;

    /// Lists objects of `kind` matching the query filters.
    async fn list(
        &self,
        kind: RemoteObjectKind,
        filters: &[(&str, &str)],
    ) -> Result<Vec<RemoteObject>, RemoteError>;
}

/// Errors from processor calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub code: RemoteErrorCode,
    pub message: String,
    /// The processor's own error code, when it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn missing_credentials() -> Self {
        Self::new(
            RemoteErrorCode::MissingCredentials,
            "payment processor secret key is not configured",
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::Network, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::Authentication, message)
    }

    pub fn not_found(kind: RemoteObjectKind, id: &str) -> Self {
        Self::new(RemoteErrorCode::NotFound, format!("{} {} not found", kind, id))
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::RateLimited, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::Provider, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorCode::InvalidResponse, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.code == RemoteErrorCode::NotFound
    }
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RemoteError {}

/// Processor error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorCode {
    /// No secret key was supplied. A wiring bug, never retried.
    MissingCredentials,
    Network,
    Authentication,
    NotFound,
    RateLimited,
    /// Any other non-2xx answer.
    Provider,
    /// A 2xx answer we could not read.
    InvalidResponse,
}

impl RemoteErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RemoteErrorCode::Network | RemoteErrorCode::RateLimited)
    }
}

impl std::fmt::Display for RemoteErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RemoteErrorCode::MissingCredentials => "missing_credentials",
            RemoteErrorCode::Network => "network_error",
            RemoteErrorCode::Authentication => "authentication_error",
            RemoteErrorCode::NotFound => "not_found",
            RemoteErrorCode::RateLimited => "rate_limited",
            RemoteErrorCode::Provider => "provider_error",
            RemoteErrorCode::InvalidResponse => "invalid_response",
        };
        write!(f, "{}", s)
    }
}

impl From<RemoteError> for BillingError {
    fn from(err: RemoteError) -> Self {
        match err.code {
            RemoteErrorCode::NotFound => BillingError::not_found("remote object", err.message),
            _ => BillingError::remote_unavailable(err.to_string(), err.retryable),
        }
    }
}
