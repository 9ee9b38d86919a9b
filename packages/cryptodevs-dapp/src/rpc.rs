//! Ethereum JSON-RPC client with primary → fallback failover and circuit breaker.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::metrics::METRICS;

const CIRCUIT_BREAKER_THRESHOLD: u64 = 5;
const CIRCUIT_BREAKER_WINDOW_MS: u64 = 30_000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Upper bound on a wallet holding `eth_sendTransaction` open for approval.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(300);
/// EIP-1193 "User Rejected Request".
const USER_REJECTED_CODE: i64 = 4001;

struct CircuitState {
    failures: u64,
    last_failure_ms: u64,
    open: bool,
}

/// Transaction submitted through `eth_sendTransaction`; the wallet signs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default)]
    pub data: Bytes,
}

/// The subset of `eth_getTransactionReceipt` the dapp reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `0x1` success, `0x0` reverted. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map_or(true, |s| s != U64::ZERO)
    }
}

enum CallError {
    /// Endpoint unreachable or returned garbage; worth failing over.
    Transport(String),
    /// Endpoint answered with a JSON-RPC error object.
    Node { code: i64, message: String },
}

impl CallError {
    fn into_error(self, method: &str) -> crate::Error {
        match self {
            CallError::Transport(msg) => crate::Error::Rpc(msg),
            CallError::Node { code, message } if code == USER_REJECTED_CODE => {
                crate::Error::Rejected(message)
            }
            CallError::Node { code, message } => {
                crate::Error::Rpc(format!("{method} failed ({code}): {message}"))
            }
        }
    }
}

/// JSON-RPC client with primary → fallback failover.
pub struct RpcClient {
    http: reqwest::Client,
    primary_url: String,
    fallback_url: String,
    circuit: Mutex<CircuitState>,
    total_failovers: AtomicU64,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(primary_url: &str, fallback_url: &str) -> Self {
        info!(
            primary = primary_url,
            fallback = fallback_url,
            "RPC client initialized with failover"
        );
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            primary_url: primary_url.to_string(),
            fallback_url: fallback_url.to_string(),
            circuit: Mutex::new(CircuitState {
                failures: 0,
                last_failure_ms: 0,
                open: false,
            }),
            total_failovers: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn primary_url(&self) -> &str {
        &self.primary_url
    }

    pub fn fallback_url(&self) -> &str {
        &self.fallback_url
    }

    // --- Typed methods ---

    pub async fn chain_id(&self) -> Result<u64, crate::Error> {
        let id: U64 = self.request("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, crate::Error> {
        self.request("eth_accounts", json!([])).await
    }

    /// Read-only contract call against the latest block.
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, crate::Error> {
        self.request("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    /// The wallet signs and broadcasts on every submission, so this is sent
    /// exactly once to the active endpoint and never failed over.
    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<B256, crate::Error> {
        self.request_once("eth_sendTransaction", json!([tx]), SEND_TIMEOUT)
            .await
    }

    /// `None` until the transaction is mined.
    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, crate::Error> {
        self.request("eth_getTransactionReceipt", json!([hash])).await
    }

    /// Quick connectivity check. Returns "ok", "degraded", or error.
    pub async fn health_check(&self) -> Result<&'static str, crate::Error> {
        let params = json!([]);
        match self
            .send(&self.primary_url, "eth_chainId", &params, REQUEST_TIMEOUT)
            .await
        {
            Ok(_) => Ok("ok"),
            Err(_) => match self
                .send(&self.fallback_url, "eth_chainId", &params, REQUEST_TIMEOUT)
                .await
            {
                Ok(_) => Ok("degraded"),
                Err(e) => Err(e.into_error("eth_chainId")),
            },
        }
    }

    // --- Transport ---

    /// Call `method` on the active endpoint, failing over on transport errors.
    /// JSON-RPC error payloads are final answers and are not retried.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, crate::Error> {
        let result = match self
            .send(self.active_url(), method, &params, REQUEST_TIMEOUT)
            .await
        {
            Ok(v) => {
                self.record_success();
                v
            }
            Err(CallError::Transport(e)) => {
                self.record_failure();
                warn!(method, error = %e, "Primary RPC failed, trying fallback");
                self.send(&self.fallback_url, method, &params, REQUEST_TIMEOUT)
                    .await
                    .map_err(|e2| match e2 {
                        CallError::Transport(e2) => crate::Error::Rpc(format!(
                            "{method} failed on both RPCs: primary={e}, fallback={e2}"
                        )),
                        other => other.into_error(method),
                    })?
            }
            Err(node_err) => return Err(node_err.into_error(method)),
        };

        decode(method, result)
    }

    /// Single attempt against the active endpoint. Transport failures still
    /// count towards the circuit breaker but are not retried.
    async fn request_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<T, crate::Error> {
        let url = self.active_url();
        let result = match self.send(url, method, &params, timeout).await {
            Ok(v) => {
                self.record_success();
                v
            }
            Err(CallError::Transport(e)) => {
                self.record_failure();
                warn!(method, url, error = %e, "RPC write failed, not retrying");
                return Err(crate::Error::Rpc(e));
            }
            Err(node_err) => return Err(node_err.into_error(method)),
        };
        decode(method, result)
    }

    async fn send(
        &self,
        url: &str,
        method: &str,
        params: &Value,
        timeout: Duration,
    ) -> Result<Value, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, url, "RPC request");

        let response = self
            .http
            .post(url)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| CallError::Transport(format!("{method} invalid JSON response: {e}")))?;

        if let Some(error) = body.get("error") {
            return Err(CallError::Node {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        if !status.is_success() {
            return Err(CallError::Transport(format!(
                "{method} returned HTTP {status} with body {body}"
            )));
        }
        body.get("result")
            .cloned()
            .ok_or_else(|| CallError::Transport(format!("{method} response missing `result`: {body}")))
    }

    // --- Failover / circuit breaker ---

    fn record_success(&self) {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        if circuit.failures > 0 {
            info!(primary = %self.primary_url, "Primary RPC recovered");
            circuit.failures = 0;
            circuit.open = false;
        }
    }

    fn record_failure(&self) {
        METRICS.rpc_errors.fetch_add(1, Ordering::Relaxed);
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        circuit.failures += 1;
        circuit.last_failure_ms = now_ms();
        if circuit.failures >= CIRCUIT_BREAKER_THRESHOLD && !circuit.open {
            circuit.open = true;
            self.total_failovers.fetch_add(1, Ordering::Relaxed);
            METRICS.rpc_failovers.fetch_add(1, Ordering::Relaxed);
            warn!(
                failures = circuit.failures,
                fallback = %self.fallback_url,
                "Circuit breaker opened, routing to fallback"
            );
        }
    }

    pub fn is_circuit_open(&self) -> bool {
        let mut circuit = self.circuit.lock().unwrap_or_else(|e| e.into_inner());
        if !circuit.open {
            return false;
        }
        if now_ms().saturating_sub(circuit.last_failure_ms) > CIRCUIT_BREAKER_WINDOW_MS {
            circuit.open = false;
            circuit.failures = 0;
            info!(primary = %self.primary_url, "Circuit breaker half-open, retrying primary");
            return false;
        }
        true
    }

    pub fn failover_count(&self) -> u64 {
        self.total_failovers.load(Ordering::Relaxed)
    }

    /// Currently active RPC URL.
    pub fn active_url(&self) -> &str {
        if self.is_circuit_open() {
            &self.fallback_url
        } else {
            &self.primary_url
        }
    }
}

fn decode<T: DeserializeOwned>(method: &str, result: Value) -> Result<T, crate::Error> {
    serde_json::from_value(result)
        .map_err(|e| crate::Error::Rpc(format!("{method} returned unexpected result: {e}")))
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
