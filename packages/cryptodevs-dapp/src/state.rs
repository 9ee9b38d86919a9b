//! Application state shared across handlers.

use crate::config::Config;
use crate::rpc::RpcClient;
use crate::session::{Session, SessionHandle, SessionSettings};
use crate::store::SessionStore;
use crate::wallet::{WalletGate, WalletProvider};
use alloy_primitives::Address;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub rpc: Arc<RpcClient>,
    pub contract_address: Address,
    pub session: Session,
    /// Live wallet session, if connected.
    pub handle: Mutex<Option<SessionHandle>>,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create application state backed by the configured JSON-RPC wallet.
    pub fn new(config: Config) -> Result<Self, crate::Error> {
        let rpc = Arc::new(RpcClient::new(&config.rpc_url, &config.fallback_rpc_url));
        Self::with_wallet(config, rpc.clone(), rpc)
    }

    /// Create application state with an explicit wallet implementation.
    pub fn with_wallet(
        config: Config,
        rpc: Arc<RpcClient>,
        wallet: Arc<dyn WalletProvider>,
    ) -> Result<Self, crate::Error> {
        let contract_address = config.contract_address()?;
        let settings = SessionSettings::from_config(&config)?;
        let gate = WalletGate::new(wallet, config.chain_id, config.network_name.clone());
        let session = Session::new(gate, contract_address, SessionStore::new(), settings);

        info!(
            contract = %contract_address,
            chain_id = config.chain_id,
            network = %config.network_name,
            "Dapp state initialized"
        );

        Ok(Self {
            config,
            rpc,
            contract_address,
            session,
            handle: Mutex::new(None),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        })
    }

    /// Replace any live session with a fresh one.
    pub async fn connect(&self) -> Result<(), crate::Error> {
        let mut handle = self.handle.lock().await;
        if let Some(old) = handle.take() {
            old.disconnect().await;
        }
        *handle = Some(self.session.connect().await?);
        Ok(())
    }

    /// Tear down the live session. Returns false if there was none.
    pub async fn disconnect(&self) -> bool {
        match self.handle.lock().await.take() {
            Some(handle) => {
                handle.disconnect().await;
                true
            }
            None => false,
        }
    }
}
