//! Crypto Devs dapp service binary.

use cryptodevs_dapp::middleware::{expected_api_key, API_KEY_ENV};
use cryptodevs_dapp::{create_router, AppState, Config};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Crypto Devs dapp");

    let config = Config::load()?;

    if expected_api_key().is_some() {
        info!("API key auth enabled");
    } else {
        warn!("{API_KEY_ENV} not set, transaction routes are unprotected (dev mode)");
    }

    info!(
        contract = %config.contract_address,
        rpc = %config.rpc_url,
        network = %config.network_name,
        "Configuration loaded"
    );

    let bind_address = config.bind_address.clone();
    let auto_connect = config.auto_connect;
    let state = Arc::new(AppState::new(config)?);

    if auto_connect {
        // A failed connect is not fatal; POST /connect retries.
        if let Err(e) = state.connect().await {
            warn!(error = %e, "Wallet not connected at startup");
        }
    }

    let app = create_router(state.clone());

    info!(address = %bind_address, "Listening");

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, ending wallet session...");
    state.disconnect().await;

    info!("Dapp shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
