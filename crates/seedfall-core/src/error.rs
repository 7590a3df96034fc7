//! Error types for the session controller.

use seedfall_ledger::LedgerError;
use seedfall_types::{ClaimState, LedgerOp};

/// Reasons a session operation was refused or failed.
///
/// None of these leave the session in a partially updated state. The one
/// exception to "nothing changed" is [`SessionError::ClaimExhausted`], where
/// the claim has been reconciled to `Completed` before the error is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The game-over latch has tripped; only harvest of a completed claim
    /// or a reset is possible.
    #[error("game is over")]
    GameOver,

    /// A drop was requested before the cooldown elapsed.
    #[error("drop cooling down for another {remaining_ms}ms")]
    CoolingDown {
        /// Time until the next drop is allowed.
        remaining_ms: u64,
    },

    /// Another ledger-backed transition has not settled yet.
    #[error("ledger call {in_flight} is still in flight")]
    Busy {
        /// The unsettled operation.
        in_flight: LedgerOp,
    },

    /// A claim was requested with no pending seeds.
    #[error("no pending seeds to claim")]
    NothingToClaim,

    /// The operation needs a remote session and the game is offline.
    #[error("no remote session: game is offline")]
    NoRemoteSession,

    /// The claim machine is not in the state the operation requires.
    #[error("claim state is {actual}, expected {expected}")]
    InvalidClaimState {
        /// Required state.
        expected: ClaimState,
        /// Current state.
        actual: ClaimState,
    },

    /// Drops are refused once the claim countdown has completed.
    #[error("claim completed: harvest before dropping again")]
    ClaimCompleted,

    /// The ledger reported the claim countdown used up. The claim has been
    /// moved to `Completed` and the drop was not performed.
    #[error("ledger reports no drops remaining; claim completed")]
    ClaimExhausted,

    /// A ledger call failed. Local state is unchanged.
    #[error("ledger call {op} failed: {source}")]
    Ledger {
        /// The operation that failed.
        op: LedgerOp,
        /// The ledger's error.
        source: LedgerError,
    },
}

impl SessionError {
    /// Whether retrying the same request later could succeed without any
    /// other state change.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::CoolingDown { .. } | Self::Busy { .. } | Self::Ledger { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_operation() {
        let err = SessionError::Ledger {
            op: LedgerOp::StartClaim,
            source: LedgerError::Timeout {
                op: LedgerOp::StartClaim,
                timeout_ms: 7000,
            },
        };
        assert!(err.to_string().contains("start_claim"));
        assert!(err.is_transient());
        assert!(!SessionError::GameOver.is_transient());
    }
}
