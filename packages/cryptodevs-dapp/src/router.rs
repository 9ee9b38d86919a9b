//! HTTP router setup.

use crate::config::Config;
use crate::handlers;
use crate::middleware::{api_key_auth, count_requests, inject_request_id};
use crate::rpc::SEND_TIMEOUT;
use crate::state::AppState;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(30);
const MAX_CONCURRENT_REQUESTS: usize = 256;

/// Outlasts a wallet approval plus the full receipt wait.
pub fn request_timeout(config: &Config) -> Duration {
    SEND_TIMEOUT + config.receipt_timeout() + REQUEST_TIMEOUT_MARGIN
}

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    let timeout = request_timeout(&state.config);
    let transactions = Router::new()
        .route("/presale/start", post(handlers::start_presale))
        .route("/mint/presale", post(handlers::presale_mint))
        .route("/mint/public", post(handlers::public_mint))
        .route_layer(from_fn(api_key_auth));

    Router::new()
        .route("/api/{token_id}", get(handlers::metadata))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/status", get(handlers::status))
        .route("/connect", post(handlers::connect))
        .route("/disconnect", post(handlers::disconnect))
        .merge(transactions)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(timeout))
                .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
                .layer(from_fn(inject_request_id))
                .layer(from_fn_with_state(state.clone(), count_requests)),
        )
        .with_state(state)
}
