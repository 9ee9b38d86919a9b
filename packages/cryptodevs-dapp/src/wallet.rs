//! Wallet connection gate.
//!
//! The wallet is an opaque capability provider: it knows the active chain, the
//! connected accounts, answers read calls and signs transactions. `WalletGate`
//! hands out read-only [`Provider`]s or write-capable [`Signer`]s, and only
//! while the wallet sits on the one chain the dapp is pinned to.

use alloy_primitives::{Address, Bytes, B256};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::rpc::{RpcClient, TransactionReceipt, TransactionRequest};

/// Boxed future returned by [`WalletProvider`] methods.
pub type ChainFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, crate::Error>> + Send + 'a>>;

/// Everything the dapp needs from a wallet.
pub trait WalletProvider: Send + Sync {
    fn chain_id(&self) -> ChainFuture<'_, u64>;
    fn accounts(&self) -> ChainFuture<'_, Vec<Address>>;
    fn call(&self, to: Address, data: Bytes) -> ChainFuture<'_, Bytes>;
    fn send_transaction(&self, tx: TransactionRequest) -> ChainFuture<'_, B256>;
    fn transaction_receipt(&self, hash: B256) -> ChainFuture<'_, Option<TransactionReceipt>>;
}

impl WalletProvider for RpcClient {
    fn chain_id(&self) -> ChainFuture<'_, u64> {
        Box::pin(RpcClient::chain_id(self))
    }

    fn accounts(&self) -> ChainFuture<'_, Vec<Address>> {
        Box::pin(RpcClient::accounts(self))
    }

    fn call(&self, to: Address, data: Bytes) -> ChainFuture<'_, Bytes> {
        Box::pin(RpcClient::call(self, to, data))
    }

    fn send_transaction(&self, tx: TransactionRequest) -> ChainFuture<'_, B256> {
        Box::pin(async move { RpcClient::send_transaction(self, &tx).await })
    }

    fn transaction_receipt(&self, hash: B256) -> ChainFuture<'_, Option<TransactionReceipt>> {
        Box::pin(RpcClient::transaction_receipt(self, hash))
    }
}

/// Read-only handle.
#[derive(Clone)]
pub struct Provider {
    wallet: Arc<dyn WalletProvider>,
}

impl Provider {
    pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, crate::Error> {
        self.wallet.call(to, data).await
    }

    pub async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, crate::Error> {
        self.wallet.transaction_receipt(hash).await
    }

    /// Poll for the receipt of `hash` until it is mined or `timeout` elapses.
    pub async fn wait_for_receipt(
        &self,
        hash: B256,
        poll: Duration,
        timeout: Duration,
    ) -> Result<TransactionReceipt, crate::Error> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.transaction_receipt(hash).await? {
                if !receipt.succeeded() {
                    return Err(crate::Error::Reverted(hash));
                }
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(crate::Error::Transaction(format!(
                    "no receipt for {hash} after {}s",
                    timeout.as_secs()
                )));
            }
            debug!(tx_hash = %hash, "Waiting for receipt");
            tokio::time::sleep(poll).await;
        }
    }
}

/// Write-capable handle bound to one wallet account.
#[derive(Clone)]
pub struct Signer {
    provider: Provider,
    address: Address,
}

impl Signer {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Ask the wallet to sign and broadcast a transaction from this account.
    pub async fn send_transaction(
        &self,
        to: Option<Address>,
        value: Option<alloy_primitives::U256>,
        data: Bytes,
    ) -> Result<B256, crate::Error> {
        let tx = TransactionRequest {
            from: self.address,
            to,
            value,
            data,
        };
        self.provider.wallet.send_transaction(tx).await
    }
}

/// What [`WalletGate::acquire`] hands out.
#[derive(Clone)]
pub enum Capability {
    Provider(Provider),
    Signer(Signer),
}

impl Capability {
    pub fn provider(&self) -> &Provider {
        match self {
            Capability::Provider(p) => p,
            Capability::Signer(s) => &s.provider,
        }
    }

    pub fn into_signer(self) -> Option<Signer> {
        match self {
            Capability::Signer(s) => Some(s),
            Capability::Provider(_) => None,
        }
    }
}

/// Enforces the single allowed network before handing out a capability.
#[derive(Clone)]
pub struct WalletGate {
    wallet: Arc<dyn WalletProvider>,
    expected_chain_id: u64,
    network_name: String,
}

impl WalletGate {
    pub fn new(
        wallet: Arc<dyn WalletProvider>,
        expected_chain_id: u64,
        network_name: impl Into<String>,
    ) -> Self {
        Self {
            wallet,
            expected_chain_id,
            network_name: network_name.into(),
        }
    }

    pub fn expected_chain_id(&self) -> u64 {
        self.expected_chain_id
    }

    /// Check the wallet's chain, then return a provider or signer.
    /// No other wallet call is made when the chain is wrong.
    pub async fn acquire(&self, needs_write: bool) -> Result<Capability, crate::Error> {
        let actual = self.wallet.chain_id().await?;
        if actual != self.expected_chain_id {
            error!(
                expected = self.expected_chain_id,
                actual,
                "Change to the {} network",
                self.network_name
            );
            return Err(crate::Error::WrongNetwork {
                expected: self.expected_chain_id,
                actual,
            });
        }

        let provider = Provider {
            wallet: Arc::clone(&self.wallet),
        };
        if !needs_write {
            return Ok(Capability::Provider(provider));
        }

        let address = self
            .wallet
            .accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(crate::Error::NoAccount)?;
        Ok(Capability::Signer(Signer { provider, address }))
    }

    pub async fn provider(&self) -> Result<Provider, crate::Error> {
        Ok(self.acquire(false).await?.provider().clone())
    }

    pub async fn signer(&self) -> Result<Signer, crate::Error> {
        self.acquire(true)
            .await?
            .into_signer()
            .ok_or(crate::Error::NoAccount)
    }
}
