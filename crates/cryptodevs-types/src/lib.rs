//! Shared types and pure-logic utilities for the Crypto Devs dapp.
//! Zero network dependency: usable by the service, the deploy script and tests.

mod metadata;
mod presale;
mod session;

pub use metadata::{COLLECTION_DESCRIPTION, TOKEN_NAME_PREFIX, TokenMetadata};
pub use presale::{PresalePhase, PresaleState, presale_has_ended};
pub use session::{ConnectedState, DappAction, MAX_SUPPLY, SessionState, next_action};
