//! HTTP request handlers.

use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::mint::{MintInvoker, MintReceipt};
use crate::response::{HealthResponse, MintResponse, StatusResponse};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use cryptodevs_types::TokenMetadata;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

/// Token metadata. `GET /api/{token_id}`
///
/// The id is echoed as given; the contract decides which ids exist.
pub async fn metadata(
    State(state): State<Arc<AppState>>,
    Path(token_id): Path<String>,
) -> Json<TokenMetadata> {
    Json(TokenMetadata::for_token(&token_id, &state.config.image_base_url))
}

/// Prometheus metrics in text exposition format.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.session.store().snapshot();
    let minted = snapshot.connected().map(|c| c.minted).unwrap_or(0);
    let body = METRICS.render(minted, snapshot.is_connected());
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        body,
    )
}

/// Health check with session and RPC status.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rpc_status = state.rpc.health_check().await.unwrap_or("unavailable");
    let snapshot = state.session.store().snapshot();

    let status = match (rpc_status, snapshot.connected()) {
        ("unavailable", _) => "unavailable",
        ("degraded", _) => "degraded",
        (_, Some(c)) if c.consecutive_failures > 0 => "degraded",
        _ => "ok",
    };

    Json(HealthResponse {
        status,
        account: snapshot.connected().map(|c| c.account.to_string()),
        contract: state.contract_address.to_string(),
        chain_id: state.config.chain_id,
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
        active_rpc: state.rpc.active_url().to_string(),
        failovers: state.rpc.failover_count(),
        rpc_status,
    })
}

/// Session snapshot and the action the UI should offer next. `GET /status`
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse::from_state(state.session.store().snapshot()))
}

/// (Re)connect the wallet session. `POST /connect`
pub async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<StatusResponse>, crate::Error> {
    if let Err(e) = state.connect().await {
        warn!(req_id = %req_id.0, error = %e, "Wallet connection failed");
        return Err(e);
    }
    info!(req_id = %req_id.0, "Wallet session started");
    Ok(Json(StatusResponse::from_state(
        state.session.store().snapshot(),
    )))
}

/// Stop the wallet session. `POST /disconnect`
pub async fn disconnect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.disconnect().await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Owner-only. `POST /presale/start`
pub async fn start_presale(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<MintResponse>, crate::Error> {
    let invoker = invoker(&state).await?;
    info!(req_id = %req_id.0, "Starting presale");
    let receipt = invoker.start_presale().await?;
    Ok(respond(&state, receipt))
}

/// Whitelisted presale mint. `POST /mint/presale`
pub async fn presale_mint(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<MintResponse>, crate::Error> {
    let invoker = invoker(&state).await?;
    info!(req_id = %req_id.0, "Presale mint requested");
    let receipt = invoker.presale_mint().await?;
    Ok(respond(&state, receipt))
}

/// Public mint. `POST /mint/public`
pub async fn public_mint(
    State(state): State<Arc<AppState>>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<MintResponse>, crate::Error> {
    let invoker = invoker(&state).await?;
    info!(req_id = %req_id.0, "Public mint requested");
    let receipt = invoker.public_mint().await?;
    Ok(respond(&state, receipt))
}

/// Invoker for the live session. The session lock is not held while the
/// transaction is pending.
async fn invoker(state: &AppState) -> Result<MintInvoker, crate::Error> {
    state
        .handle
        .lock()
        .await
        .as_ref()
        .map(|h| h.invoker())
        .ok_or(crate::Error::NoAccount)
}

fn respond(state: &AppState, receipt: MintReceipt) -> Json<MintResponse> {
    let minted = state
        .session
        .store()
        .snapshot()
        .connected()
        .map(|c| c.minted_label())
        .unwrap_or_default();
    Json(MintResponse::ok(receipt, minted))
}
