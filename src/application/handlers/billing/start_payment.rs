//! StartPaymentHandler - First half of checkout.
//!
//! Creates the remote subscription (or one-off payment intent) for an
//! estimate and hands the client secret to the browser, which confirms the
//! intent with the processor's JS library. Nothing payable skips the
//! hand-off and completes at once.

use crate::domain::billing::{
    BillingError, CheckoutBlocker, Contact, Estimate, IntentType, RemoteObjectKind,
    SubscriptionStatus,
};
use crate::domain::foundation::EstimateId;
use crate::ports::RemoteObject;

use super::checkout_finalizer::{CheckoutFinalizer, CheckoutPorts, CheckoutReceipt};
use super::synchronize::synchronize;

#[derive(Debug, Clone)]
pub struct StartPaymentCommand {
    pub estimate_id: EstimateId,
}

/// What the browser needs to confirm the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentHandoff {
    pub client_secret: String,
    pub intent_type: IntentType,
    pub intent_id: String,
    pub publishable_key: String,
}

#[derive(Debug, Clone)]
pub enum StartPaymentResult {
    /// The estimate lacks an address; send the customer back to enter it.
    RedirectToAddress(CheckoutBlocker),
    /// The client must confirm the intent, then call complete.
    AwaitingConfirmation(PaymentHandoff),
    /// Nothing was payable; the checkout is already complete.
    Completed(CheckoutReceipt),
}

pub struct StartPaymentHandler {
    ports: CheckoutPorts,
    finalizer: CheckoutFinalizer,
    publishable_key: String,
}

impl StartPaymentHandler {
    pub fn new(ports: CheckoutPorts, publishable_key: impl Into<String>) -> Self {
        Self {
            finalizer: CheckoutFinalizer::new(ports.clone()),
            ports,
            publishable_key: publishable_key.into(),
        }
    }

    pub async fn handle(&self, cmd: StartPaymentCommand) -> Result<StartPaymentResult, BillingError> {
        // 1. Load and check the estimate
        let mut estimate = self
            .ports
            .estimates
            .find_by_id(&cmd.estimate_id)
            .await?
            .ok_or_else(|| BillingError::not_found("estimate", cmd.estimate_id))?;

        match estimate.check_ready_for_payment() {
            Ok(()) => {}
            Err(CheckoutBlocker::NoItems) => {
                return Err(BillingError::validation("items", "estimate has no line items"));
            }
            Err(blocker) => {
                tracing::info!(estimate_id = %estimate.id, ?blocker, "checkout needs an address");
                return Ok(StartPaymentResult::RedirectToAddress(blocker));
            }
        }

        // 2. Upsert the remote customer
        let mut contact = self
            .ports
            .contacts
            .find_by_id(&estimate.contact_id)
            .await?
            .ok_or_else(|| BillingError::not_found("contact", estimate.contact_id))?;
        let customer_id = self.upsert_customer(&mut contact).await?;

        // 3. Create the remote subscription or intent
        if estimate.is_recurring() {
            self.start_subscription(&mut estimate, &customer_id).await
        } else {
            self.start_one_off(&mut estimate, &customer_id).await
        }
    }

    async fn upsert_customer(&self, contact: &mut Contact) -> Result<String, BillingError> {
        let outcome = synchronize(self.ports.remote.as_ref(), contact).await?;
        if outcome.assigned_id().is_some() {
            self.ports.contacts.save(contact).await?;
        }
        contact
            .remote_customer_id
            .clone()
            .ok_or_else(|| BillingError::payment_setup("customer has no remote id"))
    }

    async fn start_subscription(
        &self,
        estimate: &mut Estimate,
        customer_id: &str,
    ) -> Result<StartPaymentResult, BillingError> {
        let payload = estimate.subscription_payload(customer_id)?;
        let key = format!("subscription-create-{}", estimate.id);
        let subscription = self
            .ports
            .remote
            .create_or_update(RemoteObjectKind::Subscription, &payload, None, Some(&key))
            .await?;

        tracing::info!(
            estimate_id = %estimate.id,
            remote_subscription_id = %subscription.id,
            status = subscription.status().unwrap_or("unknown"),
            "remote subscription created"
        );

        // Trials and fully discounted periods charge nothing now; records take
        // the processor's status (`trialing` for a trial).
        if estimate.amount_due_now().is_zero() {
            estimate.record_remote_subscription(subscription.id.clone());
            self.ports.estimates.save(estimate).await?;
            let status = initial_status(&subscription)?;
            let receipt = self.finalizer.finalize(estimate, None, status).await?;
            return Ok(StartPaymentResult::Completed(receipt));
        }

        let (intent_type, intent_id, client_secret) = subscription_secret(&subscription)?;

        estimate.record_remote_subscription(subscription.id.clone());
        estimate.record_remote_intent(intent_id.clone());
        self.ports.estimates.save(estimate).await?;

        Ok(StartPaymentResult::AwaitingConfirmation(PaymentHandoff {
            client_secret,
            intent_type,
            intent_id,
            publishable_key: self.publishable_key.clone(),
        }))
    }

    async fn start_one_off(
        &self,
        estimate: &mut Estimate,
        customer_id: &str,
    ) -> Result<StartPaymentResult, BillingError> {
        if estimate.amount_due_now().is_zero() {
            let receipt = self
                .finalizer
                .finalize(estimate, None, SubscriptionStatus::Active)
                .await?;
            return Ok(StartPaymentResult::Completed(receipt));
        }

        let key = format!("payment-intent-create-{}", estimate.id);
        let intent = self
            .ports
            .remote
            .create_or_update(
                RemoteObjectKind::PaymentIntent,
                &estimate.payment_intent_payload(customer_id),
                None,
                Some(&key),
            )
            .await?;

        let client_secret = intent
            .str_field("client_secret")
            .map(str::to_string)
            .ok_or_else(|| BillingError::payment_setup("payment intent has no client secret"))?;

        estimate.record_remote_intent(intent.id.clone());
        self.ports.estimates.save(estimate).await?;

        tracing::info!(estimate_id = %estimate.id, intent_id = %intent.id, "payment intent created");
        Ok(StartPaymentResult::AwaitingConfirmation(PaymentHandoff {
            client_secret,
            intent_type: IntentType::Payment,
            intent_id: intent.id,
            publishable_key: self.publishable_key.clone(),
        }))
    }
}

/// Picks the intent the client must confirm: the first invoice's payment
/// intent, or a pending setup intent when the processor asks for one.
fn subscription_secret(subscription: &RemoteObject) -> Result<(IntentType, String, String), BillingError> {
    let candidates = [
        (IntentType::Payment, "latest_invoice.payment_intent"),
        (IntentType::Setup, "pending_setup_intent"),
    ];
    for (intent_type, path) in candidates {
        let secret = subscription.str_field(&format!("{}.client_secret", path));
        let id = subscription.str_field(&format!("{}.id", path));
        if let (Some(secret), Some(id)) = (secret, id) {
            return Ok((intent_type, id.to_string(), secret.to_string()));
        }
    }

    tracing::warn!(
        remote_subscription_id = %subscription.id,
        "subscription carries neither a payment nor a setup intent"
    );
    Err(BillingError::payment_setup(format!(
        "subscription {} has no client secret",
        subscription.id
    )))
}

fn initial_status(subscription: &RemoteObject) -> Result<SubscriptionStatus, BillingError> {
    let status = subscription.status().unwrap_or_default();
    status.parse().map_err(|_| {
        BillingError::payment_setup(format!(
            "subscription {} has unexpected status '{}'",
            subscription.id, status
        ))
    })
}
