//! Presale status reconciler.
//!
//! Mirrors the contract's presale flags, owner and mint counter into the
//! session store. One scheduled loop refreshes every derived field per tick
//! and publishes the result in a single state update.

use alloy_primitives::Address;
use cryptodevs_types::presale_has_ended;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::contract::CryptoDevsContract;
use crate::metrics::METRICS;
use crate::store::SessionStore;
use crate::wallet::WalletGate;

/// Values read during one tick. `None` means not read or read failed.
#[derive(Debug, Default)]
struct TickReads {
    started: Option<bool>,
    ended: Option<bool>,
    is_owner: Option<bool>,
    minted: Option<u64>,
}

#[derive(Clone)]
pub struct Reconciler {
    gate: WalletGate,
    contract_address: Address,
    account: Address,
    store: SessionStore,
    epoch: u64,
    interval: Duration,
    max_backoff: Duration,
}

impl Reconciler {
    pub fn new(
        gate: WalletGate,
        contract_address: Address,
        account: Address,
        store: SessionStore,
        epoch: u64,
    ) -> Self {
        Self {
            gate,
            contract_address,
            account,
            store,
            epoch,
            interval: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
        }
    }

    pub fn with_schedule(mut self, interval: Duration, max_backoff: Duration) -> Self {
        self.interval = interval;
        self.max_backoff = max_backoff.max(interval);
        self
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn gate(&self) -> &WalletGate {
        &self.gate
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    async fn contract(&self) -> Result<CryptoDevsContract, crate::Error> {
        let provider = self.gate.provider().await?;
        Ok(CryptoDevsContract::new(self.contract_address, provider))
    }

    // --- Single-field refreshes ---

    /// Read `presaleStarted()`. When it is false, also look up the owner so the
    /// owner can be offered the start-presale control.
    pub async fn refresh_presale_started(&self) -> Result<bool, crate::Error> {
        let started = self.contract().await?.presale_started().await?;
        self.store
            .update(self.epoch, |c| c.presale.record_started(started));
        if !started {
            if let Err(e) = self.refresh_owner().await {
                warn!(error = %e, "Owner lookup failed");
            }
        }
        Ok(started)
    }

    /// Compare `presaleEnded()` against wall-clock time.
    /// Rejected without a remote read while the presale has not started.
    pub async fn refresh_presale_ended(&self) -> Result<bool, crate::Error> {
        let started = self
            .store
            .read(self.epoch, |c| c.presale.started)
            .unwrap_or(false);
        if !started {
            return Err(crate::Error::PresaleNotStarted);
        }
        let end = self.contract().await?.presale_ended().await?;
        let ended = presale_has_ended(end, now_secs());
        self.store.update(self.epoch, |c| c.presale.record_ended(ended));
        Ok(ended)
    }

    pub async fn refresh_minted_count(&self) -> Result<u64, crate::Error> {
        let minted = self.contract().await?.token_ids().await?;
        self.store.update(self.epoch, |c| c.minted = minted);
        Ok(minted)
    }

    /// Compare the contract owner with this session's account.
    pub async fn refresh_owner(&self) -> Result<bool, crate::Error> {
        let owner = self.contract().await?.owner().await?;
        let is_owner = owner == self.account;
        self.store.update(self.epoch, |c| c.is_owner = is_owner);
        Ok(is_owner)
    }

    // --- Scheduled reconciliation ---

    /// One reconciliation pass over every derived field.
    ///
    /// Failed reads leave their fields stale; the first error is returned and
    /// recorded in `last_error`.
    pub async fn tick(&self) -> Result<(), crate::Error> {
        METRICS.refresh_total.fetch_add(1, Ordering::Relaxed);
        let Some(presale) = self.store.read(self.epoch, |c| c.presale) else {
            debug!(epoch = self.epoch, "Session gone, skipping tick");
            return Ok(());
        };

        let mut first_err: Option<crate::Error> = None;
        let mut reads = TickReads::default();

        match self.contract().await {
            Err(e) => first_err = Some(e),
            Ok(contract) if presale.is_terminal() => {
                reads.minted = keep(contract.token_ids().await, &mut first_err);
            }
            Ok(contract) => {
                let (started, minted) =
                    tokio::join!(contract.presale_started(), contract.token_ids());
                reads.minted = keep(minted, &mut first_err);
                reads.started = keep(started, &mut first_err);
                match reads.started {
                    Some(true) => {
                        let now = now_secs();
                        reads.ended = keep(
                            contract
                                .presale_ended()
                                .await
                                .map(|end| presale_has_ended(end, now)),
                            &mut first_err,
                        );
                    }
                    Some(false) => {
                        reads.is_owner = keep(
                            contract.owner().await.map(|owner| owner == self.account),
                            &mut first_err,
                        );
                    }
                    None => {}
                }
            }
        }

        let error_text = first_err.as_ref().map(ToString::to_string);
        self.store.update(self.epoch, |c| {
            if let Some(started) = reads.started {
                c.presale.record_started(started);
            }
            if let Some(ended) = reads.ended {
                c.presale.record_ended(ended);
            }
            if let Some(is_owner) = reads.is_owner {
                c.is_owner = is_owner;
            }
            if let Some(minted) = reads.minted {
                c.minted = minted;
            }
            match error_text {
                Some(text) => {
                    c.last_error = Some(text);
                    c.consecutive_failures = c.consecutive_failures.saturating_add(1);
                }
                None => {
                    c.last_error = None;
                    c.consecutive_failures = 0;
                }
            }
        });

        match first_err {
            Some(e) => {
                METRICS.refresh_errors.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            None => Ok(()),
        }
    }

    /// Tick every `interval` until `cancel` fires, backing off after failed ticks.
    pub async fn run(self, cancel: CancellationToken) {
        let mut failures: u32 = 0;
        loop {
            let delay = backoff_delay(self.interval, self.max_backoff, failures);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = cancel.cancelled() => {
                    info!(account = %self.account, "Reconciler shutting down");
                    return;
                }
            }

            let result = tokio::select! {
                r = self.tick() => r,
                _ = cancel.cancelled() => {
                    info!(account = %self.account, "Reconciler cancelled mid-tick");
                    return;
                }
            };

            match result {
                Ok(()) => failures = 0,
                Err(e) => {
                    failures = failures.saturating_add(1);
                    if e.is_transient() {
                        warn!(error = %e, failures, "Reconciler tick failed, keeping stale state");
                    } else {
                        error!(error = %e, failures, "Reconciler tick failed");
                    }
                }
            }
        }
    }
}

fn keep<T>(result: Result<T, crate::Error>, first_err: &mut Option<crate::Error>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "Remote read failed");
            first_err.get_or_insert(e);
            None
        }
    }
}

/// `interval · 2^failures`, capped at `max`.
pub fn backoff_delay(interval: Duration, max: Duration, failures: u32) -> Duration {
    let factor = 2u32.saturating_pow(failures.min(16));
    interval.saturating_mul(factor).min(max)
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
