//! Response types for the dapp API.

use cryptodevs_types::{DappAction, SessionState};
use serde::Serialize;

use crate::mint::MintReceipt;

/// Response from the mint and start-presale endpoints.
#[derive(Serialize)]
pub struct MintResponse {
    pub success: bool,
    pub tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub minted: String,
}

impl MintResponse {
    pub fn ok(receipt: MintReceipt, minted: String) -> Self {
        Self {
            success: true,
            tx_hash: receipt.tx_hash.to_string(),
            block_number: receipt.block_number,
            minted,
        }
    }
}

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub contract: String,
    pub chain_id: u64,
    pub uptime_secs: u64,
    pub requests: u64,
    pub active_rpc: String,
    pub failovers: u64,
    pub rpc_status: &'static str,
}

/// Response from `GET /status` and `POST /connect`.
#[derive(Serialize)]
pub struct StatusResponse {
    pub session: SessionState,
    pub action: DappAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minted: Option<String>,
}

impl StatusResponse {
    pub fn from_state(session: SessionState) -> Self {
        let action = cryptodevs_types::next_action(&session);
        let minted = session.connected().map(|c| c.minted_label());
        Self {
            session,
            action,
            minted,
        }
    }
}
