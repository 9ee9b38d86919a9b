//! API key guard and request correlation middleware.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_ENV: &str = "CRYPTODEVS_API_KEY";

static API_KEY: OnceLock<Option<String>> = OnceLock::new();

/// Key read once from `CRYPTODEVS_API_KEY`. `None` disables the guard.
pub fn expected_api_key() -> &'static Option<String> {
    API_KEY.get_or_init(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
}

fn provided_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

/// Constant-time comparison of the presented key against `expected`.
pub fn key_matches(headers: &HeaderMap, expected: &str) -> bool {
    match provided_key(headers) {
        Some(key) => key.len() == expected.len() && key.as_bytes().ct_eq(expected.as_bytes()).into(),
        None => false,
    }
}

/// Guards the transaction routes with `x-api-key` or `Authorization: Bearer`.
pub async fn api_key_auth(request: Request, next: Next) -> Response {
    let Some(expected) = expected_api_key() else {
        return next.run(request).await;
    };

    if key_matches(request.headers(), expected) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Rejected request without valid API key");
    let body = serde_json::json!({
        "success": false,
        "error": "Unauthorized: invalid or missing API key"
    });
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

/// Propagate or generate `x-request-id`.
pub async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(generate_request_id);

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", val);
    }

    response
}

/// Count every request served, whatever the route.
pub async fn count_requests(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}

fn generate_request_id() -> String {
    use rand::Rng;
    format!("dapp-{:016x}", rand::thread_rng().gen::<u64>())
}

/// Request correlation ID, extractable from `Request::extensions()`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);
