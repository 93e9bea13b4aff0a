//! Saved payment cards of a contact: list and remove.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, Contact, RemoteObjectKind};
use crate::domain::foundation::ContactId;
use crate::ports::{ContactRepository, RemoteObject, RemoteObjectClient};

/// A card as shown to its owner. The full number never leaves the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentCard {
    pub id: String,
    pub brand: String,
    /// Twelve `*` followed by the last four digits.
    pub masked_number: String,
    /// `MM/YYYY`.
    pub expiry: String,
}

impl PaymentCard {
    fn from_remote(method: &RemoteObject) -> Self {
        let last4 = method.str_field("card.last4").unwrap_or("????");
        let month = method.i64_field("card.exp_month").unwrap_or(0);
        let year = method.i64_field("card.exp_year").unwrap_or(0);
        Self {
            id: method.id.clone(),
            brand: method.str_field("card.brand").unwrap_or("unknown").to_string(),
            masked_number: format!("{}{}", "*".repeat(12), last4),
            expiry: format!("{:02}/{:04}", month, year),
        }
    }
}

async fn load_contact(
    contacts: &dyn ContactRepository,
    contact_id: ContactId,
) -> Result<Contact, BillingError> {
    contacts
        .find_by_id(&contact_id)
        .await?
        .ok_or_else(|| BillingError::not_found("contact", contact_id))
}

// ════════════════════════════════════════════════════════════════════════════════
// List
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ListCardsQuery {
    pub contact_id: ContactId,
}

pub struct ListCardsHandler {
    contacts: Arc<dyn ContactRepository>,
    remote: Arc<dyn RemoteObjectClient>,
}

impl ListCardsHandler {
    pub fn new(contacts: Arc<dyn ContactRepository>, remote: Arc<dyn RemoteObjectClient>) -> Self {
        Self { contacts, remote }
    }

    pub async fn handle(&self, query: ListCardsQuery) -> Result<Vec<PaymentCard>, BillingError> {
        let contact = load_contact(self.contacts.as_ref(), query.contact_id).await?;
        let Some(customer) = contact.remote_customer_id.as_deref() else {
            return Ok(Vec::new());
        };

        let methods = self
            .remote
            .list(
                RemoteObjectKind::PaymentMethod,
                &[("customer", customer), ("type", "card")],
            )
            .await?;
        Ok(methods.iter().map(PaymentCard::from_remote).collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Remove
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct RemoveCardCommand {
    pub contact_id: ContactId,
    pub card_id: String,
}

/// Detaches a card from the contact's remote customer.
pub struct RemoveCardHandler {
    contacts: Arc<dyn ContactRepository>,
    remote: Arc<dyn RemoteObjectClient>,
}

impl RemoveCardHandler {
    pub fn new(contacts: Arc<dyn ContactRepository>, remote: Arc<dyn RemoteObjectClient>) -> Self {
        Self { contacts, remote }
    }

    pub async fn handle(&self, cmd: RemoveCardCommand) -> Result<(), BillingError> {
        let contact = load_contact(self.contacts.as_ref(), cmd.contact_id).await?;
        let customer = contact
            .remote_customer_id
            .as_deref()
            .ok_or_else(|| BillingError::not_found("payment card", &cmd.card_id))?;

        let method = self
            .remote
            .retrieve(RemoteObjectKind::PaymentMethod, &cmd.card_id, &[])
            .await?;
        if method.str_field("customer") != Some(customer) {
            return Err(BillingError::forbidden(format!(
                "payment card {} belongs to another customer",
                cmd.card_id
            )));
        }

        self.remote
            .delete(RemoteObjectKind::PaymentMethod, &cmd.card_id)
            .await?;
        tracing::info!(contact_id = %contact.id, card_id = %cmd.card_id, "payment card detached");
        Ok(())
    }
}
