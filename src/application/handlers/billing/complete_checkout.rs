//! CompleteCheckoutHandler - Second half of checkout, after the client confirmed.

use crate::domain::billing::{BillingError, IntentType, SubscriptionStatus};
use crate::domain::foundation::EstimateId;

use super::checkout_finalizer::{CheckoutFinalizer, CheckoutPorts, CheckoutReceipt};

/// Command sent by the browser once the processor's JS confirmed the intent.
#[derive(Debug, Clone)]
pub struct CompleteCheckoutCommand {
    pub estimate_id: EstimateId,
    pub intent_id: String,
    pub intent_type: IntentType,
}

/// Handler for completing a checkout.
///
/// The intent is re-read from the processor; the browser's word that it
/// succeeded is never trusted. Nothing is written locally unless the intent
/// has `succeeded`.
pub struct CompleteCheckoutHandler {
    ports: CheckoutPorts,
    finalizer: CheckoutFinalizer,
}

impl CompleteCheckoutHandler {
    pub fn new(ports: CheckoutPorts) -> Self {
        Self {
            finalizer: CheckoutFinalizer::new(ports.clone()),
            ports,
        }
    }

    pub async fn handle(&self, cmd: CompleteCheckoutCommand) -> Result<CheckoutReceipt, BillingError> {
        // 1. Find the estimate
        let estimate = self
            .ports
            .estimates
            .find_by_id(&cmd.estimate_id)
            .await?
            .ok_or_else(|| BillingError::not_found("estimate", cmd.estimate_id))?;

        if let Some(expected) = estimate.remote_intent_id.as_deref() {
            if expected != cmd.intent_id {
                return Err(BillingError::validation(
                    "intentid",
                    "intent does not belong to this checkout",
                ));
            }
        }

        // 2. Require a succeeded intent
        let intent = self
            .ports
            .remote
            .retrieve(cmd.intent_type.remote_kind(), &cmd.intent_id, &[])
            .await?;
        let status = intent.status().unwrap_or("unknown");
        if status != "succeeded" {
            tracing::info!(
                estimate_id = %estimate.id,
                intent_id = %cmd.intent_id,
                intent_type = %cmd.intent_type,
                status,
                "checkout completion refused, intent not succeeded"
            );
            return Err(BillingError::payment_incomplete(&cmd.intent_id, status));
        }

        // 3. Invoice, default card, records, consumed estimate
        self.finalizer
            .finalize(
                &estimate,
                intent.str_field("payment_method"),
                SubscriptionStatus::Active,
            )
            .await
    }
}
