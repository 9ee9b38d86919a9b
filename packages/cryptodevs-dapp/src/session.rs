//! Wallet session lifecycle.
//!
//! `Session::connect` drives `Disconnected → Connecting → Connected`, runs one
//! immediate reconciliation pass and spawns the reconciler loop. The returned
//! [`SessionHandle`] owns the loop's cancellation token: disconnecting or
//! dropping the handle stops the loop and returns the store to `Disconnected`.

use alloy_primitives::{Address, U256};
use cryptodevs_types::{ConnectedState, SessionState};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::mint::MintInvoker;
use crate::reconciler::Reconciler;
use crate::store::SessionStore;
use crate::wallet::WalletGate;

/// Timing and pricing knobs for a session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub poll_interval: Duration,
    pub max_backoff: Duration,
    pub mint_price: U256,
    pub receipt_poll: Duration,
    pub receipt_timeout: Duration,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Result<Self, crate::Error> {
        Ok(Self {
            poll_interval: config.poll_interval(),
            max_backoff: config.max_backoff(),
            mint_price: config.mint_price()?,
            receipt_poll: config.receipt_poll(),
            receipt_timeout: config.receipt_timeout(),
        })
    }
}

/// Factory for wallet sessions against one contract.
#[derive(Clone)]
pub struct Session {
    gate: WalletGate,
    contract_address: Address,
    store: SessionStore,
    settings: SessionSettings,
}

impl Session {
    pub fn new(
        gate: WalletGate,
        contract_address: Address,
        store: SessionStore,
        settings: SessionSettings,
    ) -> Self {
        Self {
            gate,
            contract_address,
            store,
            settings,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Connect the wallet and start reconciling.
    /// On failure the store returns to `Disconnected`.
    pub async fn connect(&self) -> Result<SessionHandle, crate::Error> {
        let epoch = self.store.begin();

        let signer = match self.gate.signer().await {
            Ok(signer) => signer,
            Err(e) => {
                self.store.end(epoch);
                return Err(e);
            }
        };
        let account = signer.address();
        self.store.set_if_current(
            epoch,
            SessionState::Connected(ConnectedState::new(account)),
        );
        info!(account = %account, epoch, "Wallet connected");

        let reconciler = Reconciler::new(
            self.gate.clone(),
            self.contract_address,
            account,
            self.store.clone(),
            epoch,
        )
        .with_schedule(self.settings.poll_interval, self.settings.max_backoff);

        if let Err(e) = reconciler.tick().await {
            warn!(error = %e, "Initial refresh failed, state may be stale");
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(reconciler.clone().run(cancel.clone()));

        Ok(SessionHandle {
            reconciler,
            settings: self.settings.clone(),
            cancel,
            task: Some(task),
        })
    }
}

/// A live session. Dropping it cancels the reconciler loop.
pub struct SessionHandle {
    reconciler: Reconciler,
    settings: SessionSettings,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn account(&self) -> Address {
        self.reconciler.account()
    }

    pub fn epoch(&self) -> u64 {
        self.reconciler.epoch()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Mint/start-presale invoker bound to this session.
    pub fn invoker(&self) -> MintInvoker {
        MintInvoker::new(self.reconciler.clone(), &self.settings)
    }

    /// Stop the reconciler, wait for it to exit and return to `Disconnected`.
    pub async fn disconnect(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Reconciler task ended abnormally");
            }
        }
        self.reconciler.store().end(self.reconciler.epoch());
        info!(account = %self.account(), "Wallet disconnected");
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.reconciler.store().end(self.reconciler.epoch());
    }
}
