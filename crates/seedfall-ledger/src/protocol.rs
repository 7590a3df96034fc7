//! Request and response payloads for the ledger contract.
//!
//! The same types are the JSON-RPC wire format of [`HttpLedger`]:
//!
//! ```text
//! -> {"method": "drop_fruit", "params": {"session": 7, "entropy": 123}}
//! <- {"ok": true, "result": {"kind": "fruit_dropped", "drop_count": 4, "claim_drops_left": 2}}
//! <- {"ok": false, "error": {"code": "NO_DROPS_REMAINING", "message": "no drops remaining"}}
//! ```
//!
//! [`HttpLedger`]: crate::HttpLedger

use serde::{Deserialize, Serialize};

use seedfall_types::{LedgerOp, PlayerId, RemoteSessionId};

use crate::{LedgerError, NO_DROPS_REMAINING_CODE};

/// A mutating call against the ledger contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum LedgerRequest {
    /// Open a remote session.
    StartGame {
        /// Player opening the session.
        player: PlayerId,
    },
    /// Record one drop on the session.
    DropFruit {
        /// Target session.
        session: RemoteSessionId,
        /// Client-supplied randomness mixed into the contract's drop record.
        entropy: u64,
    },
    /// Begin the claim countdown.
    StartClaim {
        /// Target session.
        session: RemoteSessionId,
    },
    /// Redeem the pending seeds and close the session.
    CompleteHarvest {
        /// Target session.
        session: RemoteSessionId,
        /// Account credited with the seeds.
        player: PlayerId,
        /// Seeds to credit.
        seeds: u64,
    },
}

impl LedgerRequest {
    /// The contract operation this request invokes.
    pub const fn op(&self) -> LedgerOp {
        match self {
            Self::StartGame { .. } => LedgerOp::StartGame,
            Self::DropFruit { .. } => LedgerOp::DropFruit,
            Self::StartClaim { .. } => LedgerOp::StartClaim,
            Self::CompleteHarvest { .. } => LedgerOp::CompleteHarvest,
        }
    }

    /// The session this request targets, if it targets one.
    pub const fn session(&self) -> Option<RemoteSessionId> {
        match self {
            Self::StartGame { .. } => None,
            Self::DropFruit { session, .. }
            | Self::StartClaim { session }
            | Self::CompleteHarvest { session, .. } => Some(*session),
        }
    }
}

/// Successful confirmation of a [`LedgerRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerResponse {
    /// `start_game` created a session.
    GameStarted {
        /// The new session.
        session: RemoteSessionId,
    },
    /// `drop_fruit` incremented the remote drop counter.
    FruitDropped {
        /// Total drops recorded on the session.
        drop_count: u32,
        /// Claim drops left after this one, when a claim is running.
        claim_drops_left: Option<u8>,
    },
    /// `start_claim` started the countdown.
    ClaimStarted {
        /// Length of the countdown.
        drops: u8,
    },
    /// `complete_harvest` credited the player and closed the session.
    HarvestCompleted {
        /// Seeds credited.
        credited: u64,
        /// Player balance after the credit.
        balance: u64,
    },
}

impl LedgerResponse {
    /// The contract operation that produces this response.
    pub const fn op(&self) -> LedgerOp {
        match self {
            Self::GameStarted { .. } => LedgerOp::StartGame,
            Self::FruitDropped { .. } => LedgerOp::DropFruit,
            Self::ClaimStarted { .. } => LedgerOp::StartClaim,
            Self::HarvestCompleted { .. } => LedgerOp::CompleteHarvest,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

/// Error body of a failed JSON-RPC reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Contract error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl WireError {
    /// Build the wire form of a ledger error.
    pub fn from_error(error: &LedgerError) -> Self {
        Self {
            code: error.code().to_owned(),
            message: error.to_string(),
        }
    }

    /// Map the wire error back to a typed [`LedgerError`].
    pub fn into_error(self, op: LedgerOp, session: Option<RemoteSessionId>) -> LedgerError {
        match (self.code.as_str(), session) {
            (NO_DROPS_REMAINING_CODE, Some(session)) => LedgerError::NoDropsRemaining { session },
            ("UNKNOWN_SESSION", Some(session)) => LedgerError::UnknownSession(session),
            ("SESSION_CLOSED", Some(session)) => LedgerError::SessionClosed(session),
            ("CLAIM_ALREADY_STARTED", Some(session)) => LedgerError::ClaimAlreadyStarted(session),
            ("CLAIM_NOT_COMPLETED", Some(session)) => LedgerError::ClaimNotCompleted(session),
            _ => LedgerError::Rejected {
                op,
                code: self.code,
                message: self.message,
            },
        }
    }
}

/// Reply envelope of the JSON-RPC gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcEnvelope {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Confirmation, present when `ok`.
    #[serde(default)]
    pub result: Option<LedgerResponse>,
    /// Failure, present when not `ok`.
    #[serde(default)]
    pub error: Option<WireError>,
}

impl RpcEnvelope {
    /// Wrap a call result for the wire.
    pub fn from_result(result: &Result<LedgerResponse, LedgerError>) -> Self {
        match result {
            Ok(response) => Self {
                ok: true,
                result: Some(response.clone()),
                error: None,
            },
            Err(error) => Self {
                ok: false,
                result: None,
                error: Some(WireError::from_error(error)),
            },
        }
    }

    /// Unwrap the envelope into a typed result for `request`.
    ///
    /// A successful reply whose kind does not match the request is reported
    /// as [`LedgerError::UnexpectedResponse`].
    pub fn into_result(self, request: &LedgerRequest) -> Result<LedgerResponse, LedgerError> {
        let op = request.op();
        if self.ok {
            let response = self.result.ok_or_else(|| LedgerError::UnexpectedResponse {
                op,
                detail: "ok reply without result".to_owned(),
            })?;
            if response.op() != op {
                return Err(LedgerError::UnexpectedResponse {
                    op,
                    detail: format!("got a {} confirmation", response.op()),
                });
            }
            Ok(response)
        } else {
            Err(self.error.map_or_else(
                || LedgerError::UnexpectedResponse {
                    op,
                    detail: "error reply without error body".to_owned(),
                },
                |wire| wire.into_error(op, request.session()),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = LedgerRequest::DropFruit {
            session: RemoteSessionId(7),
            entropy: 123,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "drop_fruit");
        assert_eq!(json["params"]["session"], 7);
        assert_eq!(json["params"]["entropy"], 123);
    }

    #[test]
    fn error_envelope_maps_no_drops_remaining() {
        let body = r#"{"ok": false, "error": {"code": "NO_DROPS_REMAINING", "message": "no drops remaining"}}"#;
        let envelope: RpcEnvelope = serde_json::from_str(body).unwrap();
        let request = LedgerRequest::DropFruit {
            session: RemoteSessionId(3),
            entropy: 0,
        };
        let err = envelope.into_result(&request).unwrap_err();
        assert_eq!(
            err,
            LedgerError::NoDropsRemaining {
                session: RemoteSessionId(3)
            }
        );
    }

    #[test]
    fn mismatched_confirmation_is_rejected() {
        let envelope = RpcEnvelope::from_result(&Ok(LedgerResponse::ClaimStarted { drops: 5 }));
        let request = LedgerRequest::StartGame {
            player: PlayerId::new(),
        };
        let err = envelope.into_result(&request).unwrap_err();
        assert!(matches!(err, LedgerError::UnexpectedResponse { .. }));
    }

    #[test]
    fn unknown_code_becomes_rejection() {
        let wire = WireError {
            code: "OUT_OF_GAS".to_owned(),
            message: "execution ran out of gas".to_owned(),
        };
        let err = wire.into_error(LedgerOp::StartClaim, Some(RemoteSessionId(1)));
        assert_eq!(err.code(), "OUT_OF_GAS");
        assert!(!err.is_no_drops_remaining());
    }
}
