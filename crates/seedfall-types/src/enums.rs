//! Enumeration types shared between the game core, the ledger layer, and
//! the UI.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Claim state
// ---------------------------------------------------------------------------

/// Progress of the seed redemption protocol for the current game.
///
/// `Idle -> Claiming -> Completed -> (harvest) -> Idle`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClaimState {
    /// No claim is running. Pending seeds are still redeemable by starting one.
    #[default]
    Idle,
    /// The ledger accepted the claim and is counting down the final drops.
    Claiming,
    /// Every claim drop is confirmed. Only a harvest may follow.
    Completed,
}

impl ClaimState {
    /// Return the snake-case name used in logs and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Claiming => "claiming",
            Self::Completed => "completed",
        }
    }
}

impl core::fmt::Display for ClaimState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Ledger operations
// ---------------------------------------------------------------------------

/// The four mutating operations exposed by the remote ledger contract.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LedgerOp {
    /// Open a remote session for a player.
    StartGame,
    /// Record one fruit drop on the remote session.
    DropFruit,
    /// Begin the fixed drop countdown that precedes a harvest.
    StartClaim,
    /// Transfer pending seeds to the player and close the session.
    CompleteHarvest,
}

impl LedgerOp {
    /// Contract method name for this operation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StartGame => "start_game",
            Self::DropFruit => "drop_fruit",
            Self::StartClaim => "start_claim",
            Self::CompleteHarvest => "complete_harvest",
        }
    }
}

impl core::fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_state_defaults_to_idle() {
        assert_eq!(ClaimState::default(), ClaimState::Idle);
    }

    #[test]
    fn ledger_op_names_match_contract() {
        assert_eq!(LedgerOp::StartGame.as_str(), "start_game");
        assert_eq!(LedgerOp::DropFruit.to_string(), "drop_fruit");
        let json = serde_json::to_string(&LedgerOp::CompleteHarvest).ok();
        assert_eq!(json.as_deref(), Some("\"complete_harvest\""));
    }
}
