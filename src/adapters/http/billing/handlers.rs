//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the billing command/query handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Form, Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CheckoutPorts, CompleteCheckoutCommand,
    CompleteCheckoutHandler, DeleteContactCommand, DeleteContactHandler, ListCardsHandler,
    ListCardsQuery, ListSubscriptionsHandler, ListSubscriptionsQuery, ReconcileWebhookCommand,
    ReconcileWebhookHandler, ReconcileWebhookResult, RemoveCardCommand, RemoveCardHandler,
    RenewSubscriptionCommand, RenewSubscriptionHandler, SaveCouponCommand, SaveCouponHandler,
    SavePlanCommand, SavePlanHandler, StartPaymentCommand, StartPaymentHandler,
    SyncContactCommand, SyncContactHandler,
};
use crate::domain::billing::{BillingError, Contact, StripeWebhookVerifier};
use crate::domain::foundation::{
    CatalogId, ContactId, CouponId, CurrencyCode, EstimateId, Money, SubscriptionRecordId,
};
use crate::ports::{
    ContactRepository, CouponRepository, EstimateRepository, EventPublisher, InvoiceRepository,
    PlanRepository, RemoteObjectClient, SubscriptionRecordRepository, WebhookEventRepository,
};

use super::dto::{
    CancelSubscriptionRequest, CardListResponse, CompleteCheckoutForm, ContactDeletedResponse,
    ContactResponse, CouponResponse, ErrorResponse, EstimateResponse, PaymentResponse,
    PlanResponse, ReceiptResponse, SaveCouponRequest, SavePlanRequest, SubscriptionListResponse,
    SubscriptionRecordResponse, SyncContactRequest, WebhookAck,
};

/// Header carrying the processor's webhook signature.
const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct BillingAppState {
    pub remote: Arc<dyn RemoteObjectClient>,
    pub plans: Arc<dyn PlanRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub estimates: Arc<dyn EstimateRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub records: Arc<dyn SubscriptionRecordRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub event_publisher: Arc<dyn EventPublisher>,
    /// Handed to the browser alongside each client secret.
    pub publishable_key: String,
    /// Currency for plans saved without one.
    pub default_currency: CurrencyCode,
    /// `None` accepts unsigned webhook deliveries.
    pub webhook_verifier: Option<StripeWebhookVerifier>,
}

impl BillingAppState {
    pub fn checkout_ports(&self) -> CheckoutPorts {
        CheckoutPorts {
            remote: self.remote.clone(),
            plans: self.plans.clone(),
            contacts: self.contacts.clone(),
            estimates: self.estimates.clone(),
            invoices: self.invoices.clone(),
            records: self.records.clone(),
            event_publisher: self.event_publisher.clone(),
        }
    }

    /// Create handlers on demand from the shared state.
    pub fn start_payment_handler(&self) -> StartPaymentHandler {
        StartPaymentHandler::new(self.checkout_ports(), self.publishable_key.clone())
    }

    pub fn complete_checkout_handler(&self) -> CompleteCheckoutHandler {
        CompleteCheckoutHandler::new(self.checkout_ports())
    }

    pub fn cancel_subscription_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.records.clone(),
            self.remote.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn reconcile_webhook_handler(&self) -> ReconcileWebhookHandler {
        ReconcileWebhookHandler::new(
            self.webhook_verifier.clone(),
            self.webhook_events.clone(),
            self.records.clone(),
            self.invoices.clone(),
            self.plans.clone(),
            self.event_publisher.clone(),
        )
    }

    pub fn list_subscriptions_handler(&self) -> ListSubscriptionsHandler {
        ListSubscriptionsHandler::new(self.contacts.clone(), self.records.clone())
    }

    pub fn list_cards_handler(&self) -> ListCardsHandler {
        ListCardsHandler::new(self.contacts.clone(), self.remote.clone())
    }

    pub fn remove_card_handler(&self) -> RemoveCardHandler {
        RemoveCardHandler::new(self.contacts.clone(), self.remote.clone())
    }

    pub fn renew_subscription_handler(&self) -> RenewSubscriptionHandler {
        RenewSubscriptionHandler::new(
            self.contacts.clone(),
            self.plans.clone(),
            self.estimates.clone(),
        )
    }

    pub fn save_plan_handler(&self) -> SavePlanHandler {
        SavePlanHandler::new(self.plans.clone(), self.remote.clone())
    }

    pub fn save_coupon_handler(&self) -> SaveCouponHandler {
        SaveCouponHandler::new(self.coupons.clone(), self.remote.clone())
    }

    pub fn sync_contact_handler(&self) -> SyncContactHandler {
        SyncContactHandler::new(self.contacts.clone(), self.remote.clone())
    }

    pub fn delete_contact_handler(&self) -> DeleteContactHandler {
        DeleteContactHandler::new(
            self.contacts.clone(),
            self.records.clone(),
            self.remote.clone(),
            self.event_publisher.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

/// POST /checkout/:estimate_id/payment - Create the remote intent for an estimate
pub async fn start_payment(
    State(state): State<BillingAppState>,
    Path(estimate_id): Path<EstimateId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.start_payment_handler();
    let result = handler.handle(StartPaymentCommand { estimate_id }).await?;

    Ok(Json(PaymentResponse::from(result)))
}

/// POST /checkout/:estimate_id/complete - Finalize once the browser confirmed the intent
pub async fn complete_checkout(
    State(state): State<BillingAppState>,
    Path(estimate_id): Path<EstimateId>,
    Form(form): Form<CompleteCheckoutForm>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.complete_checkout_handler();
    let cmd = CompleteCheckoutCommand {
        estimate_id,
        intent_id: form.intentid,
        intent_type: form.intent,
    };

    let receipt = handler.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(ReceiptResponse::from(receipt))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions and cards
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscriptions/:record_id/cancel - Cancel remotely, then locally
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    Path(record_id): Path<SubscriptionRecordId>,
    Json(request): Json<CancelSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.cancel_subscription_handler();
    let cmd = CancelSubscriptionCommand {
        record_id,
        contact_id: request.contact_id,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(SubscriptionRecordResponse::from(result.record)))
}

/// GET /contacts/:contact_id/subscriptions
pub async fn list_subscriptions(
    State(state): State<BillingAppState>,
    Path(contact_id): Path<ContactId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.list_subscriptions_handler();
    let subscriptions = handler.handle(ListSubscriptionsQuery { contact_id }).await?;

    Ok(Json(SubscriptionListResponse { subscriptions }))
}

/// GET /contacts/:contact_id/cards
pub async fn list_cards(
    State(state): State<BillingAppState>,
    Path(contact_id): Path<ContactId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.list_cards_handler();
    let cards = handler.handle(ListCardsQuery { contact_id }).await?;

    Ok(Json(CardListResponse { cards }))
}

/// DELETE /contacts/:contact_id/cards/:card_id
pub async fn remove_card(
    State(state): State<BillingAppState>,
    Path((contact_id, card_id)): Path<(ContactId, String)>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.remove_card_handler();
    handler
        .handle(RemoveCardCommand {
            contact_id,
            card_id,
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /contacts/:contact_id/renew/:catalog_id - Draft a one-plan estimate
pub async fn renew_subscription(
    State(state): State<BillingAppState>,
    Path((contact_id, catalog_id)): Path<(ContactId, String)>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.renew_subscription_handler();
    let cmd = RenewSubscriptionCommand {
        contact_id,
        catalog_id: CatalogId::new(catalog_id).map_err(BillingError::from)?,
    };

    let estimate = handler.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(EstimateResponse::from(estimate))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Catalog and contacts (admin)
// ════════════════════════════════════════════════════════════════════════════════

/// PUT /plans/:catalog_id - Save a plan and mirror it remotely
pub async fn save_plan(
    State(state): State<BillingAppState>,
    Path(catalog_id): Path<String>,
    Json(request): Json<SavePlanRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.save_plan_handler();
    let cmd = SavePlanCommand {
        catalog_id: CatalogId::new(catalog_id).map_err(BillingError::from)?,
        title: request.title,
        price: Money::from_minor(request.price),
        currency: request
            .currency
            .unwrap_or_else(|| state.default_currency.clone()),
        interval: request.interval,
        trial_period_days: request.trial_period_days,
        retired: request.retired,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(PlanResponse::from(result.plan)))
}

/// POST /coupons - Create a coupon and mirror it remotely
pub async fn create_coupon(
    State(state): State<BillingAppState>,
    Json(request): Json<SaveCouponRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let coupon = save_coupon_with(&state, None, request).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// PUT /coupons/:coupon_id - Edit a coupon's title
pub async fn update_coupon(
    State(state): State<BillingAppState>,
    Path(coupon_id): Path<CouponId>,
    Json(request): Json<SaveCouponRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let coupon = save_coupon_with(&state, Some(coupon_id), request).await?;
    Ok(Json(coupon))
}

async fn save_coupon_with(
    state: &BillingAppState,
    coupon_id: Option<CouponId>,
    request: SaveCouponRequest,
) -> Result<CouponResponse, BillingError> {
    let handler = state.save_coupon_handler();
    let cmd = SaveCouponCommand {
        coupon_id,
        code: request.code,
        title: request.title,
        discount: request.discount,
        duration: request.duration,
    };

    let result = handler.handle(cmd).await?;
    Ok(CouponResponse::from(result.coupon))
}

/// PUT /contacts/:contact_id - Save a contact and mirror it as a remote customer
pub async fn sync_contact(
    State(state): State<BillingAppState>,
    Path(contact_id): Path<ContactId>,
    Json(request): Json<SyncContactRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let mut contact = Contact::new(request.email, request.first_name, request.surname)
        .map_err(BillingError::from)?;
    contact.id = contact_id;
    contact.default_address = request.address;
    contact.front_end_user = request.front_end_user;

    let handler = state.sync_contact_handler();
    let result = handler.handle(SyncContactCommand { contact }).await?;

    Ok(Json(ContactResponse {
        id: result.contact.id,
        email: result.contact.email,
        remote_customer_id: result.contact.remote_customer_id,
    }))
}

/// DELETE /contacts/:contact_id - Cancel every live subscription, then forget the contact
pub async fn delete_contact(
    State(state): State<BillingAppState>,
    Path(contact_id): Path<ContactId>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.delete_contact_handler();
    let result = handler.handle(DeleteContactCommand { contact_id }).await?;

    Ok(Json(ContactDeletedResponse {
        canceled_subscriptions: result.canceled,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/stripe - Reconcile a processor event
///
/// Every parsed delivery gets a 200, including ignored and failed ones, so
/// the processor never retries. Only a bad signature or malformed JSON is
/// refused.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let handler = state.reconcile_webhook_handler();
    let cmd = ReconcileWebhookCommand {
        payload: body.to_vec(),
        signature,
    };

    let ack = match handler.handle(cmd).await? {
        ReconcileWebhookResult::Processed { event_id } => WebhookAck {
            event_id,
            outcome: "processed",
        },
        ReconcileWebhookResult::Ignored { event_id, .. } => WebhookAck {
            event_id,
            outcome: "ignored",
        },
        ReconcileWebhookResult::AlreadyProcessed { event_id } => WebhookAck {
            event_id,
            outcome: "duplicate",
        },
        ReconcileWebhookResult::Failed { event_id, .. } => WebhookAck {
            event_id,
            outcome: "failed",
        },
    };

    Ok(Json(ack))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for BillingApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(BillingError::from(err))
    }
}

impl BillingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::RemoteUnavailable { .. } => StatusCode::BAD_GATEWAY,
            BillingError::PaymentSetup(_) => StatusCode::BAD_REQUEST,
            BillingError::PaymentIncomplete { .. } => StatusCode::PAYMENT_REQUIRED,
            BillingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BillingError::Conflict(_) | BillingError::InvalidState { .. } => StatusCode::CONFLICT,
            BillingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BillingError::InvalidWebhook(_) | BillingError::ValidationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "billing request failed");
        } else {
            tracing::debug!(error = %self.0, "billing request rejected");
        }

        let body = ErrorResponse::new(self.0.code().to_string(), self.0.message());
        (status, Json(body)).into_response()
    }
}
