//! Crypto Devs contract bindings.
//!
//! The contract is deployed, not authored, here. Only its external interface
//! is described, via alloy's `sol!` macro.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use tracing::debug;

use crate::wallet::{Provider, Signer};

sol! {
    /// External interface of the Crypto Devs NFT contract.
    #[derive(Debug)]
    interface ICryptoDevs {
        /// Whether the owner has opened the presale.
        function presaleStarted() external view returns (bool);
        /// Unix timestamp at which the presale closes.
        function presaleEnded() external view returns (uint256);
        function owner() external view returns (address);
        /// Number of tokens minted so far.
        function tokenIds() external view returns (uint256);
        /// Whitelisted mint during the presale.
        function presaleMint() external payable;
        /// Public mint after the presale.
        function mint() external payable;
        /// Owner-only.
        function startPresale() external;
    }
}

/// Constructor arguments: `(string baseURI, address whitelistContract)`.
pub fn constructor_args(metadata_url: &str, whitelist: Address) -> Bytes {
    (metadata_url.to_string(), whitelist).abi_encode_params().into()
}

/// Contract handle bound to a read-only provider.
#[derive(Clone)]
pub struct CryptoDevsContract {
    address: Address,
    provider: Provider,
}

impl CryptoDevsContract {
    pub fn new(address: Address, provider: Provider) -> Self {
        Self { address, provider }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn read<C: SolCall>(&self, call: C) -> Result<C::Return, crate::Error> {
        let data = self.provider.call(self.address, call.abi_encode().into()).await?;
        C::abi_decode_returns(&data, true)
            .map_err(|e| crate::Error::Abi(format!("{} returned malformed data: {e}", C::SIGNATURE)))
    }

    pub async fn presale_started(&self) -> Result<bool, crate::Error> {
        Ok(self.read(ICryptoDevs::presaleStartedCall {}).await?._0)
    }

    /// End timestamp of the presale (unix seconds).
    pub async fn presale_ended(&self) -> Result<U256, crate::Error> {
        Ok(self.read(ICryptoDevs::presaleEndedCall {}).await?._0)
    }

    pub async fn owner(&self) -> Result<Address, crate::Error> {
        Ok(self.read(ICryptoDevs::ownerCall {}).await?._0)
    }

    /// Tokens minted so far, clamped to `u64`.
    pub async fn token_ids(&self) -> Result<u64, crate::Error> {
        let count = self.read(ICryptoDevs::tokenIdsCall {}).await?._0;
        Ok(clamp_u64(count))
    }

    /// Submit `call` from `signer`, attaching `value` wei.
    pub async fn submit<C: SolCall>(
        &self,
        signer: &Signer,
        call: C,
        value: Option<U256>,
    ) -> Result<B256, crate::Error> {
        debug!(function = C::SIGNATURE, from = %signer.address(), "Submitting transaction");
        signer
            .send_transaction(Some(self.address), value, call.abi_encode().into())
            .await
    }
}

fn clamp_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.to::<u64>()
    }
}
