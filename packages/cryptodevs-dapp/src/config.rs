//! Dapp configuration.

use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, U256};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

const CONFIG_FILE_STEM: &str = "cryptodevs";
const CONFIG_FILE_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Configuration shared by the dapp service and the deploy script.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    #[serde(default = "defaults::fallback_rpc_url")]
    pub fallback_rpc_url: String,

    /// The only chain the wallet may be connected to.
    #[serde(default = "defaults::chain_id")]
    pub chain_id: u64,

    #[serde(default = "defaults::network_name")]
    pub network_name: String,

    #[serde(default = "defaults::contract_address")]
    pub contract_address: String,

    #[serde(default = "defaults::whitelist_contract_address")]
    pub whitelist_contract_address: String,

    /// Base URI passed to the contract constructor; token URIs are `{metadata_url}{id}`.
    #[serde(default = "defaults::metadata_url")]
    pub metadata_url: String,

    #[serde(default = "defaults::image_base_url")]
    pub image_base_url: String,

    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    #[serde(default = "defaults::poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "defaults::max_backoff_secs")]
    pub max_backoff_secs: u64,

    #[serde(default = "defaults::mint_price_eth")]
    pub mint_price_eth: String,

    #[serde(default = "defaults::receipt_poll_ms")]
    pub receipt_poll_ms: u64,

    #[serde(default = "defaults::receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "defaults::artifact_path")]
    pub artifact_path: String,

    /// Connect the wallet session at startup instead of waiting for `POST /connect`.
    #[serde(default = "defaults::auto_connect")]
    pub auto_connect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: defaults::rpc_url(),
            fallback_rpc_url: defaults::fallback_rpc_url(),
            chain_id: defaults::chain_id(),
            network_name: defaults::network_name(),
            contract_address: defaults::contract_address(),
            whitelist_contract_address: defaults::whitelist_contract_address(),
            metadata_url: defaults::metadata_url(),
            image_base_url: defaults::image_base_url(),
            bind_address: defaults::bind_address(),
            poll_interval_secs: defaults::poll_interval_secs(),
            max_backoff_secs: defaults::max_backoff_secs(),
            mint_price_eth: defaults::mint_price_eth(),
            receipt_poll_ms: defaults::receipt_poll_ms(),
            receipt_timeout_secs: defaults::receipt_timeout_secs(),
            artifact_path: defaults::artifact_path(),
            auto_connect: defaults::auto_connect(),
        }
    }
}

impl Config {
    /// Load from `cryptodevs.toml` (optional) and `CRYPTODEVS_*` environment variables.
    /// Unset fields take their defaults; malformed values are fatal.
    pub fn load() -> Result<Self, crate::Error> {
        match find_config_file(Path::new(".")) {
            Some(path) => info!(path = %path.display(), "Loading config file"),
            None => warn!("No config file found, using defaults and environment"),
        }

        config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE_STEM).required(false))
            .add_source(config::Environment::with_prefix("CRYPTODEVS"))
            .build()
            .and_then(|c| c.try_deserialize::<Config>())
            .map_err(|e| {
                error!(error = %e, "Invalid configuration in env vars or cryptodevs.toml");
                crate::Error::Config(e.to_string())
            })
    }

    pub fn contract_address(&self) -> Result<Address, crate::Error> {
        parse_address("contract_address", &self.contract_address)
    }

    pub fn whitelist_address(&self) -> Result<Address, crate::Error> {
        parse_address("whitelist_contract_address", &self.whitelist_contract_address)
    }

    /// Mint price in wei.
    pub fn mint_price(&self) -> Result<U256, crate::Error> {
        parse_ether(&self.mint_price_eth).map_err(|e| {
            crate::Error::Config(format!("invalid mint_price_eth {:?}: {e}", self.mint_price_eth))
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs.max(self.poll_interval_secs.max(1)))
    }

    pub fn receipt_poll(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms.max(1))
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

/// The `cryptodevs.*` file in `dir` that `Config::load` would read, if any.
fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{CONFIG_FILE_STEM}.{ext}")))
        .find(|path| path.is_file())
}

fn parse_address(field: &str, raw: &str) -> Result<Address, crate::Error> {
    raw.trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("invalid {field} {raw:?}: {e}")))
}

mod defaults {
    fn network() -> String {
        std::env::var("CRYPTODEVS_NETWORK").unwrap_or_else(|_| "goerli".into())
    }

    pub fn rpc_url() -> String {
        match std::env::var("CRYPTODEVS_RPC_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => "http://127.0.0.1:8545".into(),
        }
    }

    /// Same endpoint as the primary unless configured otherwise.
    pub fn fallback_rpc_url() -> String {
        rpc_url()
    }

    pub fn chain_id() -> u64 {
        match network().as_str() {
            "mainnet" => 1,
            "sepolia" => 11_155_111,
            _ => 5,
        }
    }

    pub fn network_name() -> String {
        network()
    }

    pub fn contract_address() -> String {
        "0x0000000000000000000000000000000000000000".into()
    }

    pub fn whitelist_contract_address() -> String {
        "0xC9923AD3E9dff4721f8c95E935d07e66115d7b19".into()
    }

    pub fn metadata_url() -> String {
        "https://crypto-devs-nft-seven.vercel.app/api/".into()
    }

    pub fn image_base_url() -> String {
        "https://raw.githubusercontent.com/lasource18/crypto-devs-nft/main/my-app/public/cryptodevs/"
            .into()
    }

    pub fn bind_address() -> String {
        "0.0.0.0:3000".into()
    }

    pub fn poll_interval_secs() -> u64 {
        5
    }

    pub fn max_backoff_secs() -> u64 {
        60
    }

    pub fn mint_price_eth() -> String {
        "0.01".into()
    }

    pub fn receipt_poll_ms() -> u64 {
        1_000
    }

    pub fn receipt_timeout_secs() -> u64 {
        300
    }

    pub fn artifact_path() -> String {
        "./artifacts/contracts/CryptoDevs.sol/CryptoDevs.json".into()
    }

    pub fn auto_connect() -> bool {
        true
    }
}
