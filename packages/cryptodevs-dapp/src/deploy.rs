//! Contract deployment.

use alloy_primitives::{Address, Bytes};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::contract::constructor_args;
use crate::wallet::Signer;

/// Load creation bytecode from a compiled artifact.
///
/// Accepts a Hardhat artifact (JSON object with a `bytecode` field) or a file
/// holding the hex bytecode alone.
pub fn load_bytecode(path: impl AsRef<Path>) -> Result<Bytes, crate::Error> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| crate::Error::Config(format!("Cannot read artifact {}: {e}", path.display())))?;
    parse_bytecode(&raw)
}

fn parse_bytecode(raw: &str) -> Result<Bytes, crate::Error> {
    let trimmed = raw.trim();
    let hex = if trimmed.starts_with('{') {
        let artifact: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| crate::Error::Config(format!("Invalid artifact JSON: {e}")))?;
        artifact
            .get("bytecode")
            .and_then(|b| b.as_str())
            .ok_or_else(|| crate::Error::Config("Artifact has no bytecode field".to_string()))?
            .to_string()
    } else {
        trimmed.to_string()
    };

    let bytecode: Bytes = hex
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid bytecode hex: {e}")))?;
    if bytecode.is_empty() {
        return Err(crate::Error::Config(
            "Bytecode is empty; is the contract abstract?".to_string(),
        ));
    }
    Ok(bytecode)
}

/// Deploy the contract with `(metadata_url, whitelist)` as constructor
/// arguments and wait for it to be mined.
pub async fn deploy(
    signer: &Signer,
    bytecode: &Bytes,
    metadata_url: &str,
    whitelist: Address,
    poll: Duration,
    timeout: Duration,
) -> Result<Address, crate::Error> {
    let args = constructor_args(metadata_url, whitelist);
    let mut data = Vec::with_capacity(bytecode.len() + args.len());
    data.extend_from_slice(bytecode);
    data.extend_from_slice(&args);

    info!(
        from = %signer.address(),
        whitelist = %whitelist,
        metadata_url,
        "Deploying Crypto Devs contract"
    );
    let tx_hash = signer.send_transaction(None, None, data.into()).await?;
    let receipt = signer.provider().wait_for_receipt(tx_hash, poll, timeout).await?;

    receipt.contract_address.ok_or_else(|| {
        crate::Error::Transaction(format!("receipt for {tx_hash} has no contract address"))
    })
}
