//! Error types for the dapp.

use alloy_primitives::B256;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt;

/// Dapp error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration error.
    Config(String),
    /// RPC transport or node error.
    Rpc(String),
    /// Wallet is on a different chain than the one the dapp is pinned to.
    WrongNetwork { expected: u64, actual: u64 },
    /// ABI encoding/decoding error.
    Abi(String),
    /// Wallet exposes no account to sign with.
    NoAccount,
    /// User rejected the signature request (EIP-1193 code 4001).
    Rejected(String),
    /// Transaction was mined but reverted.
    Reverted(B256),
    /// Transaction could not be confirmed.
    Transaction(String),
    /// Presale-end read requested before the presale started.
    PresaleNotStarted,
    /// Another transaction from this session is still pending.
    Busy,
}

impl Error {
    /// Remote-read failures leave state stale; everything else needs the caller's attention.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Rpc(_) | Error::Abi(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Rpc(msg) => write!(f, "rpc error: {msg}"),
            Error::WrongNetwork { expected, actual } => {
                write!(f, "wrong network: wallet is on chain {actual}, expected chain {expected}")
            }
            Error::Abi(msg) => write!(f, "abi error: {msg}"),
            Error::NoAccount => write!(f, "wallet has no connected account"),
            Error::Rejected(msg) => write!(f, "request rejected by wallet: {msg}"),
            Error::Reverted(hash) => write!(f, "transaction {hash} reverted"),
            Error::Transaction(msg) => write!(f, "transaction error: {msg}"),
            Error::PresaleNotStarted => write!(f, "presale has not started"),
            Error::Busy => write!(f, "a transaction is already pending"),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Rpc(_) | Error::Abi(_) => StatusCode::BAD_GATEWAY,
            Error::WrongNetwork { .. } => StatusCode::PRECONDITION_FAILED,
            Error::NoAccount => StatusCode::UNAUTHORIZED,
            Error::Rejected(_) => StatusCode::FORBIDDEN,
            Error::Reverted(_) | Error::PresaleNotStarted => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Transaction(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Busy => StatusCode::CONFLICT,
        };
        let body = serde_json::json!({
            "success": false,
            "error": self.to_string()
        });
        (status, Json(body)).into_response()
    }
}
