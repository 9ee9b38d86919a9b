//! Mint action invoker.

use alloy_primitives::{B256, U256};
use alloy_sol_types::SolCall;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::contract::{CryptoDevsContract, ICryptoDevs};
use crate::metrics::METRICS;
use crate::reconciler::Reconciler;
use crate::session::SessionSettings;
use crate::store::SessionStore;

/// Confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Holds the session's `loading` flag up; drops it on every exit path.
struct LoadingGuard {
    store: SessionStore,
    epoch: u64,
}

impl LoadingGuard {
    fn acquire(store: &SessionStore, epoch: u64) -> Result<Self, crate::Error> {
        let acquired = store
            .update(epoch, |c| {
                if c.loading {
                    false
                } else {
                    c.loading = true;
                    true
                }
            })
            .ok_or(crate::Error::NoAccount)?;
        if !acquired {
            return Err(crate::Error::Busy);
        }
        Ok(Self {
            store: store.clone(),
            epoch,
        })
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.store.update(self.epoch, |c| c.loading = false);
    }
}

/// Submits mint and start-presale transactions for one session.
#[derive(Clone)]
pub struct MintInvoker {
    reconciler: Reconciler,
    mint_price: U256,
    receipt_poll: Duration,
    receipt_timeout: Duration,
}

impl MintInvoker {
    pub fn new(reconciler: Reconciler, settings: &SessionSettings) -> Self {
        Self {
            reconciler,
            mint_price: settings.mint_price,
            receipt_poll: settings.receipt_poll,
            receipt_timeout: settings.receipt_timeout,
        }
    }

    /// Whitelisted mint during the presale.
    pub async fn presale_mint(&self) -> Result<MintReceipt, crate::Error> {
        let receipt = self
            .invoke(ICryptoDevs::presaleMintCall {}, Some(self.mint_price))
            .await?;
        self.after_mint().await;
        Ok(receipt)
    }

    /// Public mint once the presale has ended.
    pub async fn public_mint(&self) -> Result<MintReceipt, crate::Error> {
        let receipt = self
            .invoke(ICryptoDevs::mintCall {}, Some(self.mint_price))
            .await?;
        self.after_mint().await;
        Ok(receipt)
    }

    /// Owner-only. Refreshes the presale flag once confirmed.
    pub async fn start_presale(&self) -> Result<MintReceipt, crate::Error> {
        let receipt = self.invoke(ICryptoDevs::startPresaleCall {}, None).await?;
        if let Err(e) = self.reconciler.refresh_presale_started().await {
            warn!(error = %e, "Presale status refresh after start failed");
        }
        Ok(receipt)
    }

    async fn after_mint(&self) {
        info!("You successfully minted a Crypto Dev!");
        if let Err(e) = self.reconciler.refresh_minted_count().await {
            warn!(error = %e, "Minted count refresh after mint failed");
        }
    }

    async fn invoke<C: SolCall>(
        &self,
        call: C,
        value: Option<U256>,
    ) -> Result<MintReceipt, crate::Error> {
        let start = Instant::now();
        METRICS.tx_total.fetch_add(1, Ordering::Relaxed);

        let result = self.submit_and_confirm(call, value).await;
        match &result {
            Ok(receipt) => {
                METRICS.tx_success.fetch_add(1, Ordering::Relaxed);
                METRICS.record_tx_duration(start);
                info!(
                    function = C::SIGNATURE,
                    tx_hash = %receipt.tx_hash,
                    block = ?receipt.block_number,
                    "Transaction confirmed"
                );
            }
            Err(crate::Error::Rejected(reason)) => {
                METRICS.tx_rejected.fetch_add(1, Ordering::Relaxed);
                warn!(function = C::SIGNATURE, reason = %reason, "Signature request rejected");
            }
            Err(e) => {
                METRICS.tx_error.fetch_add(1, Ordering::Relaxed);
                error!(function = C::SIGNATURE, error = %e, "Transaction failed");
            }
        }
        result
    }

    async fn submit_and_confirm<C: SolCall>(
        &self,
        call: C,
        value: Option<U256>,
    ) -> Result<MintReceipt, crate::Error> {
        let _loading = LoadingGuard::acquire(self.reconciler.store(), self.reconciler.epoch())?;

        let signer = self.reconciler.gate().signer().await?;
        let contract =
            CryptoDevsContract::new(self.reconciler.contract_address(), signer.provider().clone());
        let tx_hash = contract.submit(&signer, call, value).await?;
        info!(function = C::SIGNATURE, tx_hash = %tx_hash, "Transaction submitted");

        let receipt = signer
            .provider()
            .wait_for_receipt(tx_hash, self.receipt_poll, self.receipt_timeout)
            .await?;
        Ok(MintReceipt {
            tx_hash,
            block_number: receipt.block_number.map(|b| b.to::<u64>()),
        })
    }
}
