//! Contact - the local customer identity linked to a remote customer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::foundation::{ContactId, Timestamp, ValidationError};

use super::{RemoteObjectKind, Subscribable};

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Single-line form used on estimates and invoices.
    pub fn to_single_line(&self) -> String {
        [
            Some(self.line1.as_str()),
            self.line2.as_deref(),
            Some(self.city.as_str()),
            self.state.as_deref(),
            Some(self.postal_code.as_str()),
            Some(self.country.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    fn to_remote(&self) -> Value {
        json!({
            "line1": self.line1,
            "line2": self.line2.clone().unwrap_or_default(),
            "city": self.city,
            "state": self.state.clone().unwrap_or_default(),
            "postal_code": self.postal_code,
            "country": self.country,
        })
    }
}

/// A customer of the site.
///
/// The remote customer id is assigned lazily on the first checkout or the
/// first sync, and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: String,
    pub first_name: String,
    pub surname: String,
    pub default_address: Option<Address>,
    pub remote_customer_id: Option<String>,
    pub front_end_user: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Contact {
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        surname: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let email = email.into().trim().to_string();
        if email.is_empty() {
            return Err(ValidationError::empty_field("email"));
        }
        if !email.contains('@') {
            return Err(ValidationError::invalid_format("email", "missing '@'"));
        }

        let now = Timestamp::now();
        Ok(Self {
            id: ContactId::new(),
            email,
            first_name: first_name.into(),
            surname: surname.into(),
            default_address: None,
            remote_customer_id: None,
            front_end_user: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.default_address = Some(address);
        self
    }

    pub fn as_front_end_user(mut self) -> Self {
        self.front_end_user = true;
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.surname.trim())
            .trim()
            .to_string()
    }

    /// Contact writes are pushed to the processor only for front-end users.
    pub fn should_sync_remotely(&self) -> bool {
        self.front_end_user
    }

    fn customer_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("email".into(), json!(self.email));
        payload.insert("name".into(), json!(self.full_name()));
        if let Some(address) = &self.default_address {
            payload.insert("address".into(), address.to_remote());
        }
        payload.insert("metadata".into(), json!({ "contact_id": self.id.to_string() }));
        Value::Object(payload)
    }
}

impl Subscribable for Contact {
    fn remote_kind(&self) -> RemoteObjectKind {
        RemoteObjectKind::Customer
    }

    fn remote_id(&self) -> Option<&str> {
        self.remote_customer_id.as_deref()
    }

    fn set_remote_id(&mut self, id: String) {
        self.remote_customer_id = Some(id);
    }

    fn create_payload(&self) -> Value {
        self.customer_payload()
    }

    // Customers accept every field on update, so the full state is pushed.
    fn update_payload(&self) -> Value {
        self.customer_payload()
    }

    fn idempotency_key(&self) -> String {
        format!("customer-create-{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            state: Some("IL".to_string()),
            postal_code: "62701".to_string(),
            country: "US".to_string(),
        }
    }

    #[test]
    fn new_validates_email() {
        assert!(Contact::new("", "A", "B").is_err());
        assert!(Contact::new("not-an-email", "A", "B").is_err());
        assert!(Contact::new("a@example.com", "A", "B").is_ok());
    }

    #[test]
    fn only_front_end_users_sync() {
        let contact = Contact::new("a@example.com", "Ann", "Lee").unwrap();
        assert!(!contact.should_sync_remotely());
        assert!(contact.as_front_end_user().should_sync_remotely());
    }

    #[test]
    fn payload_without_address_omits_it() {
        let contact = Contact::new("a@example.com", "Ann", "Lee").unwrap();
        let payload = contact.create_payload();
        assert_eq!(payload["email"], "a@example.com");
        assert_eq!(payload["name"], "Ann Lee");
        assert!(payload.get("address").is_none());
    }

    #[test]
    fn payload_with_address_fills_blank_optionals() {
        let contact = Contact::new("a@example.com", "Ann", "Lee")
            .unwrap()
            .with_address(address());
        let payload = contact.update_payload();
        assert_eq!(payload["address"]["city"], "Springfield");
        assert_eq!(payload["address"]["line2"], "");
        assert_eq!(payload["address"]["state"], "IL");
    }

    #[test]
    fn single_line_address_skips_blank_parts() {
        assert_eq!(
            address().to_single_line(),
            "1 Main St, Springfield, IL, 62701, US"
        );
    }

    #[test]
    fn full_name_trims_missing_parts() {
        let contact = Contact::new("a@example.com", "Ann", "").unwrap();
        assert_eq!(contact.full_name(), "Ann");
    }
}
