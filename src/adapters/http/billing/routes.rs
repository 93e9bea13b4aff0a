//! Axum router configuration for billing endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use super::handlers::{
    cancel_subscription, complete_checkout, create_coupon, delete_contact,
    handle_stripe_webhook, list_cards, list_subscriptions, remove_card, renew_subscription,
    save_plan, start_payment, sync_contact, update_coupon, BillingAppState,
};

/// Customer-facing routes.
///
/// # Routes
/// - `POST /checkout/:estimate_id/payment` - Create the remote intent
/// - `POST /checkout/:estimate_id/complete` - Finalize a confirmed intent (form body)
/// - `POST /subscriptions/:record_id/cancel` - Cancel a subscription
/// - `GET /contacts/:contact_id/subscriptions` - List subscriptions
/// - `GET /contacts/:contact_id/cards` - List saved cards
/// - `DELETE /contacts/:contact_id/cards/:card_id` - Remove a saved card
/// - `POST /contacts/:contact_id/renew/:catalog_id` - Draft a renewal estimate
pub fn checkout_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/checkout/:estimate_id/payment", post(start_payment))
        .route("/checkout/:estimate_id/complete", post(complete_checkout))
        .route("/subscriptions/:record_id/cancel", post(cancel_subscription))
        .route("/contacts/:contact_id/subscriptions", get(list_subscriptions))
        .route("/contacts/:contact_id/cards", get(list_cards))
        .route("/contacts/:contact_id/cards/:card_id", delete(remove_card))
        .route("/contacts/:contact_id/renew/:catalog_id", post(renew_subscription))
}

/// Catalog and contact maintenance routes.
///
/// # Routes
/// - `PUT /plans/:catalog_id` - Save and mirror a plan
/// - `POST /coupons` - Create and mirror a coupon
/// - `PUT /coupons/:coupon_id` - Retitle a coupon
/// - `PUT /contacts/:contact_id` - Save and mirror a contact
/// - `DELETE /contacts/:contact_id` - Cancel subscriptions and delete a contact
pub fn admin_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/plans/:catalog_id", put(save_plan))
        .route("/coupons", post(create_coupon))
        .route("/coupons/:coupon_id", put(update_coupon))
        .route("/contacts/:contact_id", put(sync_contact).delete(delete_contact))
}

/// Processor webhook routes. Authenticated by signature, not by caller.
///
/// # Routes
/// - `POST /stripe` - Reconcile a processor event
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Create the complete billing router, suitable for mounting at `/api`.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", billing_router())
///     .with_state(app_state);
/// ```
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .merge(checkout_routes())
        .merge(admin_routes())
        .nest("/webhooks", webhook_routes())
}
