//! Claim/harvest state machine.
//!
//! Mirrors the remote session: whether one exists, where the redemption
//! protocol stands, and how many claim drops are left. It also owns the
//! single in-flight slot shared by every ledger-backed transition.
//!
//! The machine only validates and records. It never calls the ledger; the
//! session controller does that and reports the outcome back through
//! [`ClaimMachine::claim_started`], [`ClaimMachine::confirm_drop`],
//! [`ClaimMachine::reconcile_exhausted`] and friends.

use tracing::{debug, info, warn};

use seedfall_types::{ClaimState, LedgerOp, RemoteSessionId};

use crate::error::SessionError;

/// Handle for one reserved ledger call.
///
/// A settlement is applied only if its ticket still owns the in-flight
/// slot. Tickets issued before a reset, a harvest or a forfeit never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallTicket {
    op: LedgerOp,
    seq: u64,
}

impl CallTicket {
    /// The operation this ticket was issued for.
    pub const fn op(self) -> LedgerOp {
        self.op
    }

    /// Issue order, unique per machine.
    pub const fn seq(self) -> u64 {
        self.seq
    }
}

/// How a drop must be carried out in the current claim state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRoute {
    /// No claim running: drop locally, no ledger involvement.
    Free,
    /// Claiming without a remote session: drop locally and count down.
    Practice,
    /// Claiming online: `drop_fruit` must be confirmed before the drop.
    Remote(RemoteSessionId),
}

/// The redemption protocol and in-flight bookkeeping for one game.
#[derive(Debug, Clone)]
pub struct ClaimMachine {
    remote: Option<RemoteSessionId>,
    state: ClaimState,
    drops_remaining: u8,
    claim_drops: u8,
    offline_claims: bool,
    in_flight: Option<CallTicket>,
    next_seq: u64,
}

impl ClaimMachine {
    /// Create an idle, offline machine.
    ///
    /// `claim_drops` is the countdown length used for practice claims;
    /// online claims take the length the ledger reports.
    pub const fn new(claim_drops: u8, offline_claims: bool) -> Self {
        Self {
            remote: None,
            state: ClaimState::Idle,
            drops_remaining: 0,
            claim_drops,
            offline_claims,
            in_flight: None,
            next_seq: 0,
        }
    }

    /// Current protocol state.
    pub const fn state(&self) -> ClaimState {
        self.state
    }

    /// Claim drops left before the countdown completes.
    pub const fn drops_remaining(&self) -> u8 {
        self.drops_remaining
    }

    /// The mirrored remote session, if the game is online.
    pub const fn remote(&self) -> Option<RemoteSessionId> {
        self.remote
    }

    /// The operation holding the in-flight slot.
    pub fn in_flight(&self) -> Option<LedgerOp> {
        self.in_flight.map(CallTicket::op)
    }

    // -----------------------------------------------------------------------
    // In-flight slot
    // -----------------------------------------------------------------------

    /// Reserve the in-flight slot for `op`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Busy`] if another call has not settled.
    pub fn begin(&mut self, op: LedgerOp) -> Result<CallTicket, SessionError> {
        if let Some(current) = self.in_flight {
            return Err(SessionError::Busy {
                in_flight: current.op,
            });
        }
        let ticket = CallTicket {
            op,
            seq: self.next_seq,
        };
        self.next_seq = self.next_seq.wrapping_add(1);
        self.in_flight = Some(ticket);
        Ok(ticket)
    }

    /// Release the slot held by `ticket`.
    ///
    /// Returns `false` when the ticket is stale, in which case the slot is
    /// left as it is and the caller must discard the settlement.
    pub fn finish(&mut self, ticket: CallTicket) -> bool {
        if self.in_flight == Some(ticket) {
            self.in_flight = None;
            true
        } else {
            debug!(op = %ticket.op, seq = ticket.seq, "discarding stale settlement");
            false
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Record the remote session returned by `start_game`.
    pub fn attach_remote(&mut self, session: RemoteSessionId) {
        self.remote = Some(session);
    }

    /// Validate a claim request.
    ///
    /// Returns the session to call `start_claim` on, or `None` for a
    /// practice claim that needs no ledger call.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidClaimState`] unless idle,
    /// [`SessionError::NothingToClaim`] with no pending seeds, and
    /// [`SessionError::NoRemoteSession`] offline when practice claims are
    /// disabled.
    pub fn check_start_claim(
        &self,
        pending_yield: u64,
    ) -> Result<Option<RemoteSessionId>, SessionError> {
        self.expect_state(ClaimState::Idle)?;
        if pending_yield == 0 {
            return Err(SessionError::NothingToClaim);
        }
        match self.remote {
            Some(session) => Ok(Some(session)),
            None if self.offline_claims => Ok(None),
            None => Err(SessionError::NoRemoteSession),
        }
    }

    /// Enter `Claiming` with a countdown of `drops`.
    pub fn claim_started(&mut self, drops: u8) {
        self.state = ClaimState::Claiming;
        self.drops_remaining = drops;
        info!(
            session = ?self.remote,
            drops,
            "claim started"
        );
    }

    /// Enter `Claiming` for a practice claim using the configured length.
    pub fn practice_claim_started(&mut self) {
        self.claim_started(self.claim_drops);
    }

    /// Decide how the next drop is carried out.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ClaimCompleted`] once the countdown is done.
    pub const fn route_drop(&self) -> Result<DropRoute, SessionError> {
        match (self.state, self.remote) {
            (ClaimState::Idle, _) => Ok(DropRoute::Free),
            (ClaimState::Claiming, Some(session)) => Ok(DropRoute::Remote(session)),
            (ClaimState::Claiming, None) => Ok(DropRoute::Practice),
            (ClaimState::Completed, _) => Err(SessionError::ClaimCompleted),
        }
    }

    /// Count one confirmed claim drop.
    ///
    /// When the ledger reports its own remaining count the lower of the two
    /// values wins, so a local counter that lags the ledger catches up.
    pub fn confirm_drop(&mut self, remote_left: Option<u8>) {
        if self.state != ClaimState::Claiming {
            return;
        }
        let local = self.drops_remaining.saturating_sub(1);
        self.drops_remaining = remote_left.map_or(local, |left| left.min(local));
        if self.drops_remaining == 0 {
            self.state = ClaimState::Completed;
            info!(session = ?self.remote, "claim countdown completed");
        }
    }

    /// The ledger says the countdown is already used up.
    pub fn reconcile_exhausted(&mut self) {
        warn!(
            session = ?self.remote,
            local_drops = self.drops_remaining,
            "ledger reports no drops remaining, forcing claim completion"
        );
        self.state = ClaimState::Completed;
        self.drops_remaining = 0;
    }

    /// Validate a harvest request and return the session to harvest.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidClaimState`] unless `Completed`,
    /// [`SessionError::NothingToClaim`] with no pending seeds, and
    /// [`SessionError::NoRemoteSession`] offline.
    pub fn check_harvest(&self, pending_yield: u64) -> Result<RemoteSessionId, SessionError> {
        self.expect_state(ClaimState::Completed)?;
        if pending_yield == 0 {
            return Err(SessionError::NothingToClaim);
        }
        self.remote.ok_or(SessionError::NoRemoteSession)
    }

    /// Apply game over to the protocol.
    ///
    /// A running claim is forfeited and the remote session dropped; an idle
    /// game just drops the remote session. A completed claim stays
    /// harvestable. Returns `true` if a claim was forfeited.
    pub fn on_game_over(&mut self) -> bool {
        match self.state {
            ClaimState::Completed => false,
            ClaimState::Idle => {
                self.detach();
                false
            }
            ClaimState::Claiming => {
                warn!(
                    session = ?self.remote,
                    drops_remaining = self.drops_remaining,
                    "game over during claim, forfeiting"
                );
                self.state = ClaimState::Idle;
                self.drops_remaining = 0;
                self.detach();
                true
            }
        }
    }

    /// Return to an idle offline machine, invalidating any in-flight ticket.
    pub fn reset(&mut self) {
        self.state = ClaimState::Idle;
        self.drops_remaining = 0;
        self.detach();
    }

    fn detach(&mut self) {
        self.remote = None;
        self.in_flight = None;
    }

    fn expect_state(&self, expected: ClaimState) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidClaimState {
                expected,
                actual: self.state,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn online() -> ClaimMachine {
        let mut machine = ClaimMachine::new(5, false);
        machine.attach_remote(RemoteSessionId(1));
        machine
    }

    #[test]
    fn one_call_in_flight_at_a_time() {
        let mut machine = online();
        let ticket = machine.begin(LedgerOp::StartClaim).unwrap();
        assert_eq!(
            machine.begin(LedgerOp::DropFruit),
            Err(SessionError::Busy {
                in_flight: LedgerOp::StartClaim
            })
        );
        assert!(machine.finish(ticket));
        assert!(machine.begin(LedgerOp::DropFruit).is_ok());
    }

    #[test]
    fn reset_makes_outstanding_ticket_stale() {
        let mut machine = online();
        let ticket = machine.begin(LedgerOp::StartClaim).unwrap();
        machine.reset();
        let fresh = machine.begin(LedgerOp::StartClaim).unwrap();
        assert!(!machine.finish(ticket));
        assert_eq!(machine.in_flight(), Some(LedgerOp::StartClaim));
        assert!(machine.finish(fresh));
    }

    #[test]
    fn countdown_reaches_completed() {
        let mut machine = online();
        machine.check_start_claim(5).unwrap();
        machine.claim_started(5);
        for _ in 0..4 {
            machine.confirm_drop(None);
        }
        assert_eq!(machine.state(), ClaimState::Claiming);
        assert_eq!(machine.drops_remaining(), 1);
        machine.confirm_drop(None);
        assert_eq!(machine.state(), ClaimState::Completed);
        assert_eq!(machine.route_drop(), Err(SessionError::ClaimCompleted));
    }

    #[test]
    fn remote_count_overrides_lagging_local_count() {
        let mut machine = online();
        machine.claim_started(5);
        machine.confirm_drop(Some(0));
        assert_eq!(machine.state(), ClaimState::Completed);
    }

    #[test]
    fn start_claim_preconditions() {
        let mut offline = ClaimMachine::new(5, false);
        assert_eq!(offline.check_start_claim(0), Err(SessionError::NothingToClaim));
        assert_eq!(offline.check_start_claim(3), Err(SessionError::NoRemoteSession));

        let practice = ClaimMachine::new(5, true);
        assert_eq!(practice.check_start_claim(3), Ok(None));

        offline.attach_remote(RemoteSessionId(9));
        assert_eq!(offline.check_start_claim(3), Ok(Some(RemoteSessionId(9))));
        offline.claim_started(5);
        assert!(matches!(
            offline.check_start_claim(3),
            Err(SessionError::InvalidClaimState { .. })
        ));
    }

    #[test]
    fn harvest_requires_completed() {
        let mut machine = online();
        for state_setup in [0_u8, 1] {
            if state_setup == 1 {
                machine.claim_started(5);
            }
            assert!(matches!(
                machine.check_harvest(5),
                Err(SessionError::InvalidClaimState {
                    expected: ClaimState::Completed,
                    ..
                })
            ));
        }
        machine.reconcile_exhausted();
        assert_eq!(machine.check_harvest(5), Ok(RemoteSessionId(1)));
        assert_eq!(machine.check_harvest(0), Err(SessionError::NothingToClaim));
    }

    #[test]
    fn game_over_forfeits_running_claim_only() {
        let mut machine = online();
        machine.claim_started(5);
        let ticket = machine.begin(LedgerOp::DropFruit).unwrap();
        assert!(machine.on_game_over());
        assert_eq!(machine.state(), ClaimState::Idle);
        assert_eq!(machine.remote(), None);
        assert!(!machine.finish(ticket));

        let mut completed = online();
        completed.claim_started(1);
        completed.confirm_drop(None);
        assert!(!completed.on_game_over());
        assert_eq!(completed.remote(), Some(RemoteSessionId(1)));
        assert_eq!(completed.state(), ClaimState::Completed);
    }
}
