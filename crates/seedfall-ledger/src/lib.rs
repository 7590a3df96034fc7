//! Remote ledger contract client for the Seedfall merge game.
//!
//! The ledger is the system of record for remote sessions and seeds. It is
//! an external, asynchronous, failure-prone RPC surface; this crate models
//! its call/response contract and nothing about its internals.
//!
//! # Contract
//!
//! | Operation | Inputs | Confirmation |
//! |-----------|--------|--------------|
//! | `start_game` | player id | new remote session id |
//! | `drop_fruit` | session id, entropy | drop counter, claim drops left |
//! | `start_claim` | session id | 5-drop countdown started |
//! | `complete_harvest` | session id, player id, seeds | credit and new balance |
//!
//! # Modules
//!
//! - [`protocol`] -- Request/response payloads and the JSON-RPC envelope.
//! - [`backend`] -- [`LedgerBackend`], enum dispatch over the backends.
//! - [`memory`] -- [`InMemoryLedger`], an in-process contract model with
//!   injectable latency and scripted faults.
//! - [`http`] -- [`HttpLedger`], JSON-RPC over HTTP via `reqwest`.

pub mod backend;
pub mod http;
pub mod memory;
pub mod protocol;

pub use backend::LedgerBackend;
pub use http::HttpLedger;
pub use memory::{CLAIM_DROPS, InMemoryLedger, RemoteSession};
pub use protocol::{LedgerRequest, LedgerResponse, RpcEnvelope, WireError};

use seedfall_types::{LedgerOp, RemoteSessionId};

/// Wire code the contract uses when a claim countdown is already exhausted.
pub const NO_DROPS_REMAINING_CODE: &str = "NO_DROPS_REMAINING";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors returned by a ledger call.
///
/// Every variant is recoverable from the caller's point of view: the local
/// game state is never modified by a failed call, and retrying is always
/// the caller's decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The request never produced a response (connection, signing, I/O).
    #[error("ledger transport failed during {op}: {message}")]
    Transport {
        /// The operation being attempted.
        op: LedgerOp,
        /// Description of the failure.
        message: String,
    },

    /// The request did not complete before the configured deadline.
    #[error("ledger call {op} timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation being attempted.
        op: LedgerOp,
        /// The deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The contract executed the call and rejected it.
    #[error("ledger rejected {op}: [{code}] {message}")]
    Rejected {
        /// The operation being attempted.
        op: LedgerOp,
        /// Contract error code.
        code: String,
        /// Contract error message.
        message: String,
    },

    /// The claim countdown on this session is already exhausted.
    #[error("no drops remaining on {session}")]
    NoDropsRemaining {
        /// The session whose countdown is exhausted.
        session: RemoteSessionId,
    },

    /// The contract has no record of the session.
    #[error("unknown remote session {0}")]
    UnknownSession(RemoteSessionId),

    /// The session was already closed by a harvest.
    #[error("remote session {0} is closed")]
    SessionClosed(RemoteSessionId),

    /// `start_claim` was called twice on the same session.
    #[error("claim already started on {0}")]
    ClaimAlreadyStarted(RemoteSessionId),

    /// `complete_harvest` was called before the countdown reached zero.
    #[error("claim on {0} has not completed")]
    ClaimNotCompleted(RemoteSessionId),

    /// The response did not match the request.
    #[error("unexpected response to {op}: {detail}")]
    UnexpectedResponse {
        /// The operation being attempted.
        op: LedgerOp,
        /// What was wrong with the response.
        detail: String,
    },

    /// A read-only balance query failed.
    #[error("balance query failed: {message}")]
    Query {
        /// Description of the failure.
        message: String,
    },
}

impl LedgerError {
    /// Whether the ledger is saying the claim countdown is already used up.
    ///
    /// Besides the typed variant, a generic rejection carrying the contract
    /// code or the contract's message text counts as well.
    pub fn is_no_drops_remaining(&self) -> bool {
        match self {
            Self::NoDropsRemaining { .. } => true,
            Self::Rejected { code, message, .. } => {
                code == NO_DROPS_REMAINING_CODE
                    || message.to_ascii_lowercase().contains("no drops remaining")
            }
            _ => false,
        }
    }

    /// Contract error code for this error, used on the wire.
    pub fn code(&self) -> &str {
        match self {
            Self::Transport { .. } => "TRANSPORT",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Rejected { code, .. } => code,
            Self::NoDropsRemaining { .. } => NO_DROPS_REMAINING_CODE,
            Self::UnknownSession(_) => "UNKNOWN_SESSION",
            Self::SessionClosed(_) => "SESSION_CLOSED",
            Self::ClaimAlreadyStarted(_) => "CLAIM_ALREADY_STARTED",
            Self::ClaimNotCompleted(_) => "CLAIM_NOT_COMPLETED",
            Self::UnexpectedResponse { .. } => "UNEXPECTED_RESPONSE",
            Self::Query { .. } => "QUERY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_no_drops_is_detected() {
        let err = LedgerError::NoDropsRemaining {
            session: RemoteSessionId(1),
        };
        assert!(err.is_no_drops_remaining());
        assert_eq!(err.code(), NO_DROPS_REMAINING_CODE);
    }

    #[test]
    fn rejection_message_is_detected() {
        let err = LedgerError::Rejected {
            op: LedgerOp::DropFruit,
            code: "EXECUTION_FAILED".to_owned(),
            message: "Error: No drops remaining".to_owned(),
        };
        assert!(err.is_no_drops_remaining());
    }

    #[test]
    fn other_errors_are_not_reconciliation() {
        let err = LedgerError::Transport {
            op: LedgerOp::DropFruit,
            message: "connection reset".to_owned(),
        };
        assert!(!err.is_no_drops_remaining());
        assert!(!LedgerError::SessionClosed(RemoteSessionId(2)).is_no_drops_remaining());
    }
}
