//! Deploys the Crypto Devs contract and prints its address.

use cryptodevs_dapp::deploy::{deploy, load_bytecode};
use cryptodevs_dapp::rpc::RpcClient;
use cryptodevs_dapp::{Config, WalletGate};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Deployment failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), cryptodevs_dapp::Error> {
    let config = Config::load()?;
    let whitelist = config.whitelist_address()?;
    let bytecode = load_bytecode(&config.artifact_path)?;
    info!(artifact = %config.artifact_path, bytes = bytecode.len(), "Loaded bytecode");

    let rpc = Arc::new(RpcClient::new(&config.rpc_url, &config.fallback_rpc_url));
    let gate = WalletGate::new(rpc, config.chain_id, config.network_name.clone());
    let signer = gate.signer().await?;

    let address = deploy(
        &signer,
        &bytecode,
        &config.metadata_url,
        whitelist,
        config.receipt_poll(),
        config.receipt_timeout(),
    )
    .await?;

    println!("Crypto Devs Contract Address: {address}");
    Ok(())
}
