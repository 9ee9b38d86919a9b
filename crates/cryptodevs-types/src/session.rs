//! Wallet session state machine and the action a user can take next.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::presale::PresaleState;

/// Number of tokens the collection can ever mint.
pub const MAX_SUPPLY: u64 = 20;

/// Session lifecycle: `Disconnected → Connecting → Connected`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(ConnectedState),
}

/// Everything the dapp knows once a wallet is connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedState {
    pub account: Address,
    pub is_owner: bool,
    pub presale: PresaleState,
    pub minted: u64,
    /// A transaction submitted by this session is awaiting confirmation.
    pub loading: bool,
    /// Last refresh failure; `None` after a clean pass.
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl ConnectedState {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            is_owner: false,
            presale: PresaleState::default(),
            minted: 0,
            loading: false,
            last_error: None,
            consecutive_failures: 0,
        }
    }

    pub fn minted_label(&self) -> String {
        format!("{}/{MAX_SUPPLY} have been minted", self.minted)
    }
}

impl SessionState {
    pub fn connected(&self) -> Option<&ConnectedState> {
        match self {
            Self::Connected(c) => Some(c),
            _ => None,
        }
    }

    pub fn connected_mut(&mut self) -> Option<&mut ConnectedState> {
        match self {
            Self::Connected(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

/// The single control the page offers in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DappAction {
    ConnectWallet,
    Loading,
    StartPresale,
    AwaitPresale,
    PresaleMint,
    PublicMint,
}

/// Pick the next action. First match wins.
pub fn next_action(state: &SessionState) -> DappAction {
    let Some(c) = state.connected() else {
        return DappAction::ConnectWallet;
    };
    if c.loading {
        return DappAction::Loading;
    }
    match (c.is_owner, c.presale.started, c.presale.ended) {
        (true, false, _) => DappAction::StartPresale,
        (false, false, _) => DappAction::AwaitPresale,
        (_, true, false) => DappAction::PresaleMint,
        (_, true, true) => DappAction::PublicMint,
    }
}
