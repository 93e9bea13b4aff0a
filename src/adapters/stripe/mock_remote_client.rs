//! Mock remote object client for testing.
//!
//! Behaves like a small in-process Stripe: objects are stored by kind and id,
//! creates honour idempotency keys, subscriptions come back with an expanded
//! latest invoice or pending setup intent, and intents can be moved to
//! `succeeded` by the test. Supports:
//! - Error injection (next call, or every call of one method)
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::ports::{RemoteError, RemoteObject, RemoteObjectClient, RemoteObjectKind};

/// Mock remote object client.
///
/// # Example
///
/// ```ignore
/// let remote = MockRemoteObjectClient::new();
/// remote.set_subscription_status("trialing");
/// remote.set_method_error("delete", RemoteError::network("connection reset"));
/// ```
#[derive(Clone, Default)]
pub struct MockRemoteObjectClient {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    objects: HashMap<(RemoteObjectKind, String), Value>,

    /// Idempotency key -> id of the object the first create produced.
    idempotency: HashMap<String, (RemoteObjectKind, String)>,

    /// Status given to newly created subscriptions (default `incomplete`).
    subscription_status: Option<String>,

    next_id: u64,

    /// Error to return on next call.
    next_error: Option<RemoteError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, RemoteError>,

    call_log: Vec<RemoteCall>,
}

/// Recorded call for assertions.
#[derive(Debug, Clone)]
pub struct RemoteCall {
    /// `create`, `update`, `retrieve`, `delete` or `list`.
    pub method: String,
    pub kind: RemoteObjectKind,
    pub id: Option<String>,
    pub idempotency_key: Option<String>,
    pub payload: Option<Value>,
}

impl MockRemoteObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Status for subscriptions created from now on.
    pub fn set_subscription_status(&self, status: &str) {
        self.state().subscription_status = Some(status.to_string());
    }

    /// Stores an object as if the processor already had it. The body needs an `id`.
    pub fn insert_object(&self, kind: RemoteObjectKind, mut body: Value) {
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if let Some(map) = body.as_object_mut() {
            map.entry("object")
                .or_insert_with(|| Value::String(kind.object_name().to_string()));
        }
        self.state().objects.insert((kind, id), body);
    }

    /// Sets a top-level field on a stored object.
    pub fn set_field(&self, kind: RemoteObjectKind, id: &str, field: &str, value: Value) {
        if let Some(Value::Object(map)) = self.state().objects.get_mut(&(kind, id.to_string())) {
            map.insert(field.to_string(), value);
        }
    }

    /// Marks an intent as confirmed by the client, attaching a payment method.
    pub fn succeed_intent(&self, kind: RemoteObjectKind, id: &str) {
        self.set_field(kind, id, "status", json!("succeeded"));
        self.set_field(kind, id, "payment_method", json!(format!("pm_for_{}", id)));
    }

    /// Error returned by the next call, whatever it is.
    pub fn set_error(&self, error: RemoteError) {
        self.state().next_error = Some(error);
    }

    /// Error returned by every call of `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: RemoteError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection Methods
    // ════════════════════════════════════════════════════════════════════════════

    pub fn object(&self, kind: RemoteObjectKind, id: &str) -> Option<Value> {
        self.state().objects.get(&(kind, id.to_string())).cloned()
    }

    pub fn object_count(&self, kind: RemoteObjectKind) -> usize {
        self.state().objects.keys().filter(|(k, _)| *k == kind).count()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state().call_log.iter().filter(|c| c.method == method).count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    fn record_call(
        &self,
        method: &str,
        kind: RemoteObjectKind,
        id: Option<&str>,
        idempotency_key: Option<&str>,
        payload: Option<&Value>,
    ) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.call_log.push(RemoteCall {
            method: method.to_string(),
            kind,
            id: id.map(str::to_string),
            idempotency_key: idempotency_key.map(str::to_string),
            payload: payload.cloned(),
        });

        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        if let Some(err) = state.method_errors.get(method) {
            return Err(err.clone());
        }
        Ok(())
    }
}

fn id_prefix(kind: RemoteObjectKind) -> &'static str {
    match kind {
        RemoteObjectKind::Customer => "cus",
        RemoteObjectKind::PaymentMethod => "pm",
        RemoteObjectKind::SetupIntent => "seti",
        RemoteObjectKind::PaymentIntent => "pi",
        RemoteObjectKind::Subscription => "sub",
        RemoteObjectKind::Plan => "plan",
        RemoteObjectKind::Coupon => "coupon",
    }
}

impl MockState {
    fn generate_id(&mut self, kind: RemoteObjectKind) -> String {
        self.next_id += 1;
        format!("{}_mock_{}", id_prefix(kind), self.next_id)
    }

    fn new_intent(&mut self, kind: RemoteObjectKind, extra: Map<String, Value>) -> Value {
        let id = self.generate_id(kind);
        let mut body = extra;
        body.insert("id".to_string(), json!(id));
        body.insert("object".to_string(), json!(kind.object_name()));
        body.insert("client_secret".to_string(), json!(format!("{}_secret_mock", id)));
        body.insert("status".to_string(), json!("requires_payment_method"));
        let body = Value::Object(body);
        self.objects.insert((kind, id), body.clone());
        body
    }

    /// Builds a subscription body the way Stripe answers a create with
    /// `expand[]=latest_invoice.payment_intent`.
    fn new_subscription(&mut self, id: &str, payload: &Map<String, Value>) -> Map<String, Value> {
        let status = self
            .subscription_status
            .clone()
            .unwrap_or_else(|| "incomplete".to_string());
        let period_end = chrono::Utc::now().timestamp() + 30 * 24 * 60 * 60;

        let items: Vec<Value> = payload
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        json!({
                            "id": format!("si_mock_{}_{}", id, i),
                            "price": { "id": item.get("price").cloned().unwrap_or(Value::Null) },
                            "quantity": item.get("quantity").cloned().unwrap_or(json!(1)),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut body = Map::new();
        body.insert("status".to_string(), json!(status));
        body.insert("current_period_end".to_string(), json!(period_end));
        body.insert("items".to_string(), json!({ "object": "list", "data": items }));

        let customer = payload.get("customer").cloned().unwrap_or(Value::Null);
        match status.as_str() {
            "incomplete" => {
                let mut extra = Map::new();
                extra.insert("customer".to_string(), customer);
                let intent = self.new_intent(RemoteObjectKind::PaymentIntent, extra);
                body.insert(
                    "latest_invoice".to_string(),
                    json!({ "id": format!("in_mock_{}", id), "payment_intent": intent }),
                );
                body.insert("pending_setup_intent".to_string(), Value::Null);
            }
            "trialing" => {
                let mut extra = Map::new();
                extra.insert("customer".to_string(), customer);
                let intent = self.new_intent(RemoteObjectKind::SetupIntent, extra);
                body.insert(
                    "latest_invoice".to_string(),
                    json!({ "id": format!("in_mock_{}", id), "payment_intent": null }),
                );
                body.insert("pending_setup_intent".to_string(), intent);
            }
            _ => {
                body.insert(
                    "latest_invoice".to_string(),
                    json!({ "id": format!("in_mock_{}", id), "payment_intent": null }),
                );
                body.insert("pending_setup_intent".to_string(), Value::Null);
            }
        }
        body
    }
}

#[async_trait]
impl RemoteObjectClient for MockRemoteObjectClient {
    async fn create_or_update(
        &self,
        kind: RemoteObjectKind,
        payload: &Value,
        existing_id: Option<&str>,
        idempotency_key: Option<&str>,
    ) -> Result<RemoteObject, RemoteError> {
        let method = if existing_id.is_some() { "update" } else { "create" };
        self.record_call(method, kind, existing_id, idempotency_key, Some(payload))?;

        let fields = payload.as_object().cloned().unwrap_or_default();
        let mut state = self.state();

        if let Some(id) = existing_id {
            let key = (kind, id.to_string());
            let Some(Value::Object(existing)) = state.objects.get_mut(&key) else {
                return Err(RemoteError::not_found(kind, id));
            };
            for (field, value) in fields {
                if field != "expand" {
                    existing.insert(field, value);
                }
            }
            let body = Value::Object(existing.clone());
            return RemoteObject::from_body(kind, body);
        }

        if let Some(key) = idempotency_key {
            if let Some(stored) = state.idempotency.get(key).cloned() {
                if let Some(body) = state.objects.get(&stored) {
                    return RemoteObject::from_body(kind, body.clone());
                }
            }
        }

        // Plans and coupons keep a caller-chosen id, like Stripe.
        let id = match fields.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => state.generate_id(kind),
        };
        if state.objects.contains_key(&(kind, id.clone())) {
            return Err(RemoteError::provider(format!("{} {} already exists", kind, id))
                .with_provider_code("resource_already_exists"));
        }

        let mut body = match kind {
            RemoteObjectKind::Subscription => state.new_subscription(&id, &fields),
            RemoteObjectKind::PaymentIntent | RemoteObjectKind::SetupIntent => {
                let mut body = Map::new();
                body.insert("client_secret".to_string(), json!(format!("{}_secret_mock", id)));
                body.insert("status".to_string(), json!("requires_payment_method"));
                body
            }
            _ => Map::new(),
        };
        for (field, value) in fields {
            if field == "expand" || (field == "items" && kind == RemoteObjectKind::Subscription) {
                continue;
            }
            body.entry(field).or_insert(value);
        }
        body.insert("id".to_string(), json!(id));
        body.insert("object".to_string(), json!(kind.object_name()));

        let body = Value::Object(body);
        state.objects.insert((kind, id.clone()), body.clone());
        if let Some(key) = idempotency_key {
            state.idempotency.insert(key.to_string(), (kind, id));
        }
        RemoteObject::from_body(kind, body)
    }

    async fn retrieve(
        &self,
        kind: RemoteObjectKind,
        id: &str,
        _expand: &[&str],
    ) -> Result<RemoteObject, RemoteError> {
        self.record_call("retrieve", kind, Some(id), None, None)?;
        let body = self
            .object(kind, id)
            .ok_or_else(|| RemoteError::not_found(kind, id))?;
        RemoteObject::from_body(kind, body)
    }

    async fn delete(&self, kind: RemoteObjectKind, id: &str) -> Result<RemoteObject, RemoteError> {
        self.record_call("delete", kind, Some(id), None, None)?;
        let mut state = self.state();
        let key = (kind, id.to_string());

        let body = match kind {
            RemoteObjectKind::Subscription
            | RemoteObjectKind::PaymentIntent
            | RemoteObjectKind::SetupIntent => {
                let Some(Value::Object(existing)) = state.objects.get_mut(&key) else {
                    return Err(RemoteError::not_found(kind, id));
                };
                existing.insert("status".to_string(), json!("canceled"));
                Value::Object(existing.clone())
            }
            RemoteObjectKind::PaymentMethod => {
                let Some(Value::Object(existing)) = state.objects.get_mut(&key) else {
                    return Err(RemoteError::not_found(kind, id));
                };
                existing.insert("customer".to_string(), Value::Null);
                Value::Object(existing.clone())
            }
            _ => {
                if state.objects.remove(&key).is_none() {
                    return Err(RemoteError::not_found(kind, id));
                }
                json!({ "id": id, "object": kind.object_name(), "deleted": true })
            }
        };
        RemoteObject::from_body(kind, body)
    }

    async fn list(
        &self,
        kind: RemoteObjectKind,
        filters: &[(&str, &str)],
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        self.record_call("list", kind, None, None, None)?;
        let state = self.state();

        let mut matching: Vec<RemoteObject> = state
            .objects
            .iter()
            .filter(|((k, _), body)| {
                *k == kind
                    && filters
                        .iter()
                        .all(|(field, value)| body.get(*field).and_then(Value::as_str) == Some(*value))
            })
            .map(|((k, id), body)| RemoteObject::new(*k, id.clone(), body.clone()))
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }
}
