//! Presale status as mirrored from the contract.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Local mirror of the contract's presale flags.
///
/// Invariant: `ended ⇒ started`. `record_ended` refuses to break it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresaleState {
    pub started: bool,
    pub ended: bool,
}

/// Coarse minting phase derived from [`PresaleState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresalePhase {
    NotStarted,
    Presale,
    Public,
}

impl PresaleState {
    /// Store the remote `presaleStarted()` flag.
    /// A presale that is reported as not started cannot have ended.
    pub fn record_started(&mut self, started: bool) {
        self.started = started;
        if !started {
            self.ended = false;
        }
    }

    /// Store the result of an end-timestamp comparison.
    /// Returns `false` and leaves state untouched when the presale has not started.
    pub fn record_ended(&mut self, ended: bool) -> bool {
        if !self.started {
            return false;
        }
        self.ended = ended;
        true
    }

    /// Once ended, started/ended no longer change on-chain.
    pub fn is_terminal(&self) -> bool {
        self.started && self.ended
    }

    pub fn phase(&self) -> PresalePhase {
        match (self.started, self.ended) {
            (false, _) => PresalePhase::NotStarted,
            (true, false) => PresalePhase::Presale,
            (true, true) => PresalePhase::Public,
        }
    }
}

/// `presaleEnded()` returns the unix timestamp at which the presale closes.
/// The presale has ended when that timestamp is strictly before `now_secs`.
pub fn presale_has_ended(end_timestamp: U256, now_secs: u64) -> bool {
    end_timestamp < U256::from(now_secs)
}
