//! HTTP adapters - REST API implementations.

pub mod billing;

pub use billing::billing_router;
pub use billing::BillingAppState;

use std::time::Duration;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Assembles the service: billing routes under `/api`, a health probe and
/// the tower-http middleware stack.
///
/// CORS is only installed when `cors_origins` is non-empty.
pub fn app(state: BillingAppState, request_timeout: Duration, cors_origins: &[String]) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api", billing_router())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout));

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if !origins.is_empty() {
        router = router.layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_origin(AllowOrigin::list(origins)),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn health() -> StatusCode {
    StatusCode::OK
}
