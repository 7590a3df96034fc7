//! In-process model of the ledger contract.
//!
//! [`InMemoryLedger`] keeps sessions, drop counters, the claim countdown and
//! player balances behind a shared async mutex. It answers exactly like the
//! remote contract, including its rejections, and adds two test levers:
//! artificial latency and a queue of scripted faults consumed by the next
//! matching call.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use seedfall_types::{LedgerOp, PlayerId, RemoteSessionId};

use crate::LedgerError;
use crate::protocol::{LedgerRequest, LedgerResponse};

/// Length of the claim countdown started by `start_claim`.
pub const CLAIM_DROPS: u8 = 5;

/// Contract-side record of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    /// Owner of the session.
    pub player: PlayerId,
    /// Drops recorded on the session.
    pub drop_count: u32,
    /// Remaining claim drops, `None` until a claim starts.
    pub claim_drops_left: Option<u8>,
    /// Entropy supplied with the most recent drop.
    pub last_entropy: Option<u64>,
    /// Whether a harvest closed the session.
    pub closed: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_session: u64,
    sessions: BTreeMap<RemoteSessionId, RemoteSession>,
    balances: BTreeMap<PlayerId, u64>,
    faults: VecDeque<(LedgerOp, LedgerError)>,
    latency: Duration,
    calls: Vec<LedgerOp>,
}

/// Shared handle to an in-process ledger. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<MemoryState>>,
}

impl InMemoryLedger {
    /// Create an empty ledger that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty ledger that waits `latency` before answering.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState {
                latency,
                ..MemoryState::default()
            })),
        }
    }

    /// Change the artificial latency applied to every call.
    pub async fn set_latency(&self, latency: Duration) {
        self.inner.lock().await.latency = latency;
    }

    /// Make the next call of kind `op` fail with `error` instead of executing.
    ///
    /// Faults queue up and are consumed in order, one per matching call.
    pub async fn fail_next(&self, op: LedgerOp, error: LedgerError) {
        self.inner.lock().await.faults.push_back((op, error));
    }

    /// Zero the claim countdown of `session` behind the client's back.
    ///
    /// Reproduces a client whose local counter went stale: the next
    /// `drop_fruit` on the session is rejected with
    /// [`LedgerError::NoDropsRemaining`].
    pub async fn exhaust_claim(&self, session: RemoteSessionId) -> Result<(), LedgerError> {
        let mut state = self.inner.lock().await;
        let record = state
            .sessions
            .get_mut(&session)
            .ok_or(LedgerError::UnknownSession(session))?;
        record.claim_drops_left = Some(0);
        Ok(())
    }

    /// Contract-side record of a session.
    pub async fn session(&self, session: RemoteSessionId) -> Option<RemoteSession> {
        self.inner.lock().await.sessions.get(&session).cloned()
    }

    /// Seeds credited to `player` so far.
    pub async fn balance_of(&self, player: PlayerId) -> u64 {
        self.inner
            .lock()
            .await
            .balances
            .get(&player)
            .copied()
            .unwrap_or(0)
    }

    /// Every operation executed or faulted so far, in call order.
    pub async fn call_log(&self) -> Vec<LedgerOp> {
        self.inner.lock().await.calls.clone()
    }

    /// Execute a contract call.
    ///
    /// # Errors
    ///
    /// Returns the contract's rejection, or a scripted fault queued with
    /// [`fail_next`](Self::fail_next).
    pub async fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, LedgerError> {
        let latency = self.inner.lock().await.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.inner.lock().await;
        let op = request.op();
        state.calls.push(op);

        if let Some(pos) = state.faults.iter().position(|(fault_op, _)| *fault_op == op) {
            if let Some((_, error)) = state.faults.remove(pos) {
                debug!(op = %op, error = %error, "in-memory ledger injecting fault");
                return Err(error);
            }
        }

        let response = state.apply(request)?;
        debug!(op = %op, ?response, "in-memory ledger confirmed call");
        Ok(response)
    }
}

impl MemoryState {
    fn apply(&mut self, request: &LedgerRequest) -> Result<LedgerResponse, LedgerError> {
        match *request {
            LedgerRequest::StartGame { player } => {
                self.next_session = self.next_session.saturating_add(1);
                let session = RemoteSessionId(self.next_session);
                self.sessions.insert(
                    session,
                    RemoteSession {
                        player,
                        drop_count: 0,
                        claim_drops_left: None,
                        last_entropy: None,
                        closed: false,
                    },
                );
                Ok(LedgerResponse::GameStarted { session })
            }
            LedgerRequest::DropFruit { session, entropy } => {
                let record = self.open_session(session)?;
                let claim_drops_left = match record.claim_drops_left {
                    Some(0) => return Err(LedgerError::NoDropsRemaining { session }),
                    Some(left) => Some(left.saturating_sub(1)),
                    None => None,
                };
                record.claim_drops_left = claim_drops_left;
                record.drop_count = record.drop_count.saturating_add(1);
                record.last_entropy = Some(entropy);
                Ok(LedgerResponse::FruitDropped {
                    drop_count: record.drop_count,
                    claim_drops_left,
                })
            }
            LedgerRequest::StartClaim { session } => {
                let record = self.open_session(session)?;
                if record.claim_drops_left.is_some() {
                    return Err(LedgerError::ClaimAlreadyStarted(session));
                }
                record.claim_drops_left = Some(CLAIM_DROPS);
                Ok(LedgerResponse::ClaimStarted { drops: CLAIM_DROPS })
            }
            LedgerRequest::CompleteHarvest {
                session,
                player,
                seeds,
            } => {
                let record = self.open_session(session)?;
                if record.claim_drops_left != Some(0) {
                    return Err(LedgerError::ClaimNotCompleted(session));
                }
                if record.player != player {
                    return Err(LedgerError::Rejected {
                        op: LedgerOp::CompleteHarvest,
                        code: "NOT_SESSION_OWNER".to_owned(),
                        message: format!("{player} does not own {session}"),
                    });
                }
                record.closed = true;
                let balance = self.balances.entry(player).or_insert(0);
                *balance = balance.saturating_add(seeds);
                Ok(LedgerResponse::HarvestCompleted {
                    credited: seeds,
                    balance: *balance,
                })
            }
        }
    }

    fn open_session(&mut self, session: RemoteSessionId) -> Result<&mut RemoteSession, LedgerError> {
        let record = self
            .sessions
            .get_mut(&session)
            .ok_or(LedgerError::UnknownSession(session))?;
        if record.closed {
            return Err(LedgerError::SessionClosed(session));
        }
        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn started(ledger: &InMemoryLedger, player: PlayerId) -> RemoteSessionId {
        match ledger
            .execute(&LedgerRequest::StartGame { player })
            .await
            .unwrap()
        {
            LedgerResponse::GameStarted { session } => session,
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_claim_cycle_credits_player() {
        let ledger = InMemoryLedger::new();
        let player = PlayerId::new();
        let session = started(&ledger, player).await;

        let claim = ledger
            .execute(&LedgerRequest::StartClaim { session })
            .await
            .unwrap();
        assert_eq!(claim, LedgerResponse::ClaimStarted { drops: CLAIM_DROPS });

        for expected_left in (0..CLAIM_DROPS).rev() {
            let drop = ledger
                .execute(&LedgerRequest::DropFruit { session, entropy: 9 })
                .await
                .unwrap();
            assert!(matches!(
                drop,
                LedgerResponse::FruitDropped { claim_drops_left: Some(left), .. } if left == expected_left
            ));
        }

        let harvest = ledger
            .execute(&LedgerRequest::CompleteHarvest {
                session,
                player,
                seeds: 12,
            })
            .await
            .unwrap();
        assert_eq!(
            harvest,
            LedgerResponse::HarvestCompleted {
                credited: 12,
                balance: 12
            }
        );
        assert_eq!(ledger.balance_of(player).await, 12);
        assert!(ledger.session(session).await.unwrap().closed);
    }

    #[tokio::test]
    async fn drop_after_countdown_reports_no_drops_remaining() {
        let ledger = InMemoryLedger::new();
        let session = started(&ledger, PlayerId::new()).await;
        ledger
            .execute(&LedgerRequest::StartClaim { session })
            .await
            .unwrap();
        ledger.exhaust_claim(session).await.unwrap();

        let err = ledger
            .execute(&LedgerRequest::DropFruit { session, entropy: 1 })
            .await
            .unwrap_err();
        assert!(err.is_no_drops_remaining());
    }

    #[tokio::test]
    async fn harvest_before_countdown_is_rejected() {
        let ledger = InMemoryLedger::new();
        let player = PlayerId::new();
        let session = started(&ledger, player).await;
        let err = ledger
            .execute(&LedgerRequest::CompleteHarvest {
                session,
                player,
                seeds: 3,
            })
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::ClaimNotCompleted(session));
    }

    #[tokio::test]
    async fn scripted_fault_is_consumed_once() {
        let ledger = InMemoryLedger::new();
        let fault = LedgerError::Transport {
            op: LedgerOp::StartGame,
            message: "wallet locked".to_owned(),
        };
        ledger.fail_next(LedgerOp::StartGame, fault.clone()).await;

        let player = PlayerId::new();
        let first = ledger.execute(&LedgerRequest::StartGame { player }).await;
        assert_eq!(first, Err(fault));
        let second = ledger.execute(&LedgerRequest::StartGame { player }).await;
        assert!(second.is_ok());
        assert_eq!(
            ledger.call_log().await,
            vec![LedgerOp::StartGame, LedgerOp::StartGame]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_the_answer() {
        let ledger = InMemoryLedger::with_latency(Duration::from_millis(250));
        let started_at = tokio::time::Instant::now();
        let _ = ledger
            .execute(&LedgerRequest::StartGame {
                player: PlayerId::new(),
            })
            .await
            .unwrap();
        assert!(started_at.elapsed() >= Duration::from_millis(250));
    }
}
