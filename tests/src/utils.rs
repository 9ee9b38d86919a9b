//! Shared fixtures: an in-process JSON-RPC node and app builders.

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::{SolCall, SolValue};
use anyhow::Result;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use cryptodevs_dapp::contract::ICryptoDevs;
use cryptodevs_dapp::{create_router, AppState, Config};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub const ACCOUNT: Address = Address::repeat_byte(0xaa);
pub const OWNER: Address = Address::repeat_byte(0x0e);
pub const CONTRACT: Address = Address::repeat_byte(0xcd);
pub const DEPLOYED: Address = Address::repeat_byte(0xde);
pub const WHITELIST: Address = Address::repeat_byte(0x77);

/// Chain and wallet state behind the mock node.
pub struct NodeState {
    pub chain_id: u64,
    pub accounts: Vec<Address>,
    pub presale_started: bool,
    pub presale_end: U256,
    pub owner: Address,
    pub token_ids: u64,
    pub reject_sends: bool,
    pub revert_sends: bool,
    /// Answer every request with HTTP 502 after counting it.
    pub unavailable: bool,
    pub sent: Vec<Value>,
    pub calls: HashMap<String, usize>,
    receipts: HashMap<B256, Value>,
    next_hash: u8,
}

/// A wallet-backed JSON-RPC node listening on an ephemeral local port.
#[derive(Clone)]
pub struct MockNode {
    pub url: String,
    state: Arc<Mutex<NodeState>>,
}

impl MockNode {
    pub async fn start() -> Result<Self> {
        let state = Arc::new(Mutex::new(NodeState {
            chain_id: 5,
            accounts: vec![ACCOUNT],
            presale_started: false,
            presale_end: U256::ZERO,
            owner: OWNER,
            token_ids: 0,
            reject_sends: false,
            revert_sends: false,
            unavailable: false,
            sent: Vec::new(),
            calls: HashMap::new(),
            receipts: HashMap::new(),
            next_hash: 1,
        }));

        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { url, state })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut NodeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// How often `name` was requested: an RPC method or a contract function.
    pub fn calls(&self, name: &str) -> usize {
        self.with(|s| s.calls.get(name).copied().unwrap_or(0))
    }
}

async fn handle_rpc(
    State(state): State<Arc<Mutex<NodeState>>>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();

    let mut node = state.lock().unwrap();
    *node.calls.entry(method.clone()).or_default() += 1;
    if node.unavailable {
        return (StatusCode::BAD_GATEWAY, Json(json!({ "message": "bad gateway" })));
    }

    let outcome = match method.as_str() {
        "eth_chainId" => Ok(json!(U64::from(node.chain_id))),
        "eth_accounts" => Ok(json!(node.accounts)),
        "eth_call" => answer_call(&mut node, &params[0]),
        "eth_sendTransaction" => accept_transaction(&mut node, &params[0]),
        "eth_getTransactionReceipt" => {
            let hash: B256 = serde_json::from_value(params[0].clone()).unwrap_or_default();
            Ok(node.receipts.get(&hash).cloned().unwrap_or(Value::Null))
        }
        other => Err((-32601, format!("method {other} not found"))),
    };

    let body = match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    };
    (StatusCode::OK, Json(body))
}

fn selector(data: &Bytes) -> [u8; 4] {
    data.get(..4)
        .and_then(|s| s.try_into().ok())
        .unwrap_or_default()
}

fn answer_call(node: &mut NodeState, call: &Value) -> Result<Value, (i64, String)> {
    let data: Bytes = serde_json::from_value(call["data"].clone()).unwrap_or_default();
    let selector = selector(&data);
    let (name, encoded) = if selector == ICryptoDevs::presaleStartedCall::SELECTOR {
        ("presaleStarted", node.presale_started.abi_encode())
    } else if selector == ICryptoDevs::presaleEndedCall::SELECTOR {
        ("presaleEnded", node.presale_end.abi_encode())
    } else if selector == ICryptoDevs::ownerCall::SELECTOR {
        ("owner", node.owner.abi_encode())
    } else if selector == ICryptoDevs::tokenIdsCall::SELECTOR {
        ("tokenIds", U256::from(node.token_ids).abi_encode())
    } else {
        return Err((3, "execution reverted".to_string()));
    };
    *node.calls.entry(name.to_string()).or_default() += 1;
    Ok(json!(Bytes::from(encoded)))
}

fn accept_transaction(node: &mut NodeState, tx: &Value) -> Result<Value, (i64, String)> {
    if node.reject_sends {
        return Err((4001, "User denied transaction signature".to_string()));
    }
    let data: Bytes = serde_json::from_value(tx["data"].clone()).unwrap_or_default();
    let selector = selector(&data);
    if !node.revert_sends {
        if selector == ICryptoDevs::startPresaleCall::SELECTOR {
            node.presale_started = true;
        } else if selector == ICryptoDevs::mintCall::SELECTOR
            || selector == ICryptoDevs::presaleMintCall::SELECTOR
        {
            node.token_ids += 1;
        }
    }

    let hash = B256::repeat_byte(node.next_hash);
    node.next_hash = node.next_hash.wrapping_add(1);
    let contract_address = if tx.get("to").is_none() {
        json!(DEPLOYED)
    } else {
        Value::Null
    };
    node.receipts.insert(
        hash,
        json!({
            "transactionHash": hash,
            "blockNumber": U64::from(100 + node.next_hash as u64),
            "status": if node.revert_sends { "0x0" } else { "0x1" },
            "contractAddress": contract_address,
        }),
    );
    node.sent.push(tx.clone());
    Ok(json!(hash))
}

/// Config pointing at `node` with fast polling.
pub fn test_config(node: &MockNode) -> Config {
    Config {
        rpc_url: node.url.clone(),
        fallback_rpc_url: node.url.clone(),
        chain_id: 5,
        network_name: "goerli".to_string(),
        contract_address: CONTRACT.to_string(),
        whitelist_contract_address: WHITELIST.to_string(),
        poll_interval_secs: 1,
        max_backoff_secs: 2,
        receipt_poll_ms: 20,
        receipt_timeout_secs: 5,
        auto_connect: false,
        ..Config::default()
    }
}

pub fn build_app(config: Config) -> Result<(Router, Arc<AppState>)> {
    let state = Arc::new(AppState::new(config)?);
    Ok((create_router(state.clone()), state))
}

/// Drive one request through the router.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
) -> Result<(StatusCode, HeaderMap, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = app.clone().oneshot(builder.body(Body::empty())?).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    Ok((status, headers, body))
}

/// Wait until the session snapshot satisfies `pred`, or fail after `timeout`.
pub async fn wait_for_state(
    state: &AppState,
    timeout: Duration,
    pred: impl Fn(&cryptodevs_types::SessionState) -> bool,
) -> Result<()> {
    let mut rx = state.session.store().subscribe();
    tokio::time::timeout(timeout, async {
        loop {
            if pred(&*rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("session state did not converge within {timeout:?}"))
}
