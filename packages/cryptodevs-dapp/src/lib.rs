//! # Crypto Devs Dapp
//!
//! Minting service for the Crypto Devs NFT collection. Serves token metadata,
//! keeps a wallet session in sync with the contract's presale state and
//! submits mint transactions through the connected wallet.
//!
//! ## Quick Start
//! ```bash
//! cargo run --bin cryptodevs-dapp
//! cargo run --bin cryptodevs-deploy
//! ```
//!
//! ## Endpoints
//! - `GET /api/{token_id}` - Token metadata
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//! - `GET /status` - Session state and next UI action
//! - `POST /connect`, `POST /disconnect` - Wallet session lifecycle
//! - `POST /presale/start` - Owner starts the presale
//! - `POST /mint/presale`, `POST /mint/public` - Mint one token

pub mod config;
pub mod contract;
pub mod deploy;
mod error;
mod handlers;
pub mod metrics;
pub mod middleware;
pub mod mint;
pub mod reconciler;
mod response;
mod router;
pub mod rpc;
pub mod session;
mod state;
pub mod store;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::Error;
pub use mint::{MintInvoker, MintReceipt};
pub use reconciler::Reconciler;
pub use router::create as create_router;
pub use session::{Session, SessionHandle, SessionSettings};
pub use state::AppState;
pub use store::SessionStore;
pub use wallet::{WalletGate, WalletProvider};
