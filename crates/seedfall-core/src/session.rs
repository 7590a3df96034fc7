//! Session controller: the single owner of a game's mutable state.
//!
//! Everything that changes a game goes through [`SessionController`]. It
//! owns the entity registry, score and pending yield, the game-over latch
//! and the claim machine, and it is the only place ledger results are
//! turned into state changes.
//!
//! # Ledger transitions
//!
//! Each ledger-backed transition is split in two synchronous halves.
//! `begin_*` validates, reserves the in-flight slot and hands back a
//! [`PendingCall`]. The caller executes the request on the ledger however
//! it likes and passes the outcome to [`SessionController::settle`]. Until
//! then nothing changes locally. A settlement whose ticket was invalidated
//! in the meantime (reset, forfeited claim) is discarded.
//!
//! The `async` wrappers [`start_game`](SessionController::start_game),
//! [`drop_at`](SessionController::drop_at),
//! [`start_claim`](SessionController::start_claim) and
//! [`harvest`](SessionController::harvest) run both halves inline.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use seedfall_ledger::{LedgerBackend, LedgerError, LedgerRequest, LedgerResponse};
use seedfall_types::{
    ClaimState, Collision, EntityDelta, HarvestReceipt, LedgerOp, PlayerId, Point, Rank,
    RemoteSessionId, SessionSnapshot, SpawnedEntity,
};

use crate::claim::{CallTicket, ClaimMachine, DropRoute};
use crate::clock::Clock;
use crate::config::{BoardConfig, GameConfig, RulesConfig};
use crate::error::SessionError;
use crate::game_over::{GameOverEvent, GameOverLatch, GameOverRule};
use crate::merge::apply_batch;
use crate::physics::BodyQuery;
use crate::rank::radius_for;
use crate::registry::EntityRegistry;

// ---------------------------------------------------------------------------
// Call handles
// ---------------------------------------------------------------------------

/// A reserved ledger call waiting to be executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    /// Ticket to hand back to [`SessionController::settle`].
    pub ticket: CallTicket,
    /// The request to execute against the ledger.
    pub request: LedgerRequest,
}

/// Result of [`SessionController::request_drop`].
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// The fruit entered play immediately.
    Dropped(EntityDelta),
    /// The drop happens only once the ledger confirms it.
    AwaitingLedger(PendingCall),
}

/// What a settlement did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// `start_game` settled. `None` means the game continues offline.
    GameStarted {
        /// The new remote session.
        session: Option<RemoteSessionId>,
    },
    /// A confirmed claim drop entered play.
    Dropped(EntityDelta),
    /// The claim countdown started.
    ClaimStarted {
        /// Length of the countdown.
        drops: u8,
    },
    /// Seeds were credited and the game reset.
    Harvested(HarvestReceipt),
    /// The ticket had been invalidated; nothing changed.
    Stale,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct GameStats {
    merges: u32,
    drops: u32,
    highest_rank: Rank,
}

impl Default for GameStats {
    fn default() -> Self {
        Self {
            merges: 0,
            drops: 0,
            highest_rank: Rank::MIN,
        }
    }
}

/// Owner of one player's game.
pub struct SessionController {
    board: BoardConfig,
    rules: RulesConfig,
    game_over_rule: GameOverRule,
    ledger: LedgerBackend,
    clock: Arc<dyn Clock>,
    player: PlayerId,
    rng: StdRng,
    registry: EntityRegistry,
    score: u64,
    pending_yield: u64,
    latch: GameOverLatch,
    claim: ClaimMachine,
    next_rank: Rank,
    stats: GameStats,
    harvested_total: u64,
    last_drop_ms: Option<u64>,
    awaiting_drop_x: Option<f32>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("player", &self.player)
            .field("ledger", &self.ledger.name())
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Create a controller for `player` with an empty, offline game.
    pub fn new(
        config: &GameConfig,
        ledger: LedgerBackend,
        clock: Arc<dyn Clock>,
        player: PlayerId,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(config.rules.seed);
        let next_rank = roll_rank(&mut rng, config.rules.max_spawn_rank);
        Self {
            board: config.board.clone(),
            rules: config.rules.clone(),
            game_over_rule: GameOverRule::from_config(config),
            ledger,
            clock,
            player,
            rng,
            registry: EntityRegistry::new(),
            score: 0,
            pending_yield: 0,
            latch: GameOverLatch::new(),
            claim: ClaimMachine::new(config.rules.claim_drops, config.rules.offline_claims),
            next_rank,
            stats: GameStats::default(),
            harvested_total: 0,
            last_drop_ms: None,
            awaiting_drop_x: None,
        }
    }

    /// The ledger this controller talks to.
    pub const fn ledger(&self) -> &LedgerBackend {
        &self.ledger
    }

    /// The player whose game this is.
    pub const fn player(&self) -> PlayerId {
        self.player
    }

    /// Read access to the live discs.
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Whether the game-over latch has tripped.
    pub const fn is_game_over(&self) -> bool {
        self.latch.is_tripped()
    }

    /// The event that ended the game, if it has ended.
    pub const fn game_over_event(&self) -> Option<&GameOverEvent> {
        self.latch.event()
    }

    /// Immutable view of the session as it is now.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            score: self.score,
            pending_yield: self.pending_yield,
            is_game_over: self.latch.is_tripped(),
            claim_state: self.claim.state(),
            drops_remaining: self.claim.drops_remaining(),
            remote_session: self.claim.remote(),
            in_flight: self.claim.in_flight(),
            next_rank: self.next_rank,
            entity_count: u32::try_from(self.registry.len()).unwrap_or(u32::MAX),
            highest_rank: self.stats.highest_rank,
            merges: self.stats.merges,
            drops: self.stats.drops,
            harvested_total: self.harvested_total,
        }
    }

    // -----------------------------------------------------------------------
    // Ledger transitions, first half
    // -----------------------------------------------------------------------

    /// Start a fresh game and reserve the `start_game` call.
    ///
    /// Any current game is discarded.
    pub fn begin_start_game(&mut self) -> Result<PendingCall, SessionError> {
        if let Some(in_flight) = self.claim.in_flight() {
            return Err(SessionError::Busy { in_flight });
        }
        self.reset();
        let ticket = self.claim.begin(LedgerOp::StartGame)?;
        Ok(PendingCall {
            ticket,
            request: LedgerRequest::StartGame {
                player: self.player,
            },
        })
    }

    /// Drop the next fruit at horizontal position `x`.
    ///
    /// Outside a claim, or in a practice claim, the fruit enters play at
    /// once. During an online claim the drop is reserved and happens when
    /// the ledger confirms it.
    pub fn request_drop(&mut self, x: f32) -> Result<DropOutcome, SessionError> {
        if self.latch.is_tripped() {
            return Err(SessionError::GameOver);
        }
        let now = self.clock.now_ms();
        if let Some(last) = self.last_drop_ms {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.rules.drop_cooldown_ms {
                return Err(SessionError::CoolingDown {
                    remaining_ms: self.rules.drop_cooldown_ms.saturating_sub(elapsed),
                });
            }
        }

        match self.claim.route_drop()? {
            DropRoute::Free => Ok(DropOutcome::Dropped(self.perform_drop(x))),
            DropRoute::Practice => {
                let delta = self.perform_drop(x);
                self.claim.confirm_drop(None);
                Ok(DropOutcome::Dropped(delta))
            }
            DropRoute::Remote(session) => {
                let ticket = self.claim.begin(LedgerOp::DropFruit)?;
                self.awaiting_drop_x = Some(x);
                let entropy = self.rng.random::<u64>();
                Ok(DropOutcome::AwaitingLedger(PendingCall {
                    ticket,
                    request: LedgerRequest::DropFruit { session, entropy },
                }))
            }
        }
    }

    /// Start the claim countdown.
    ///
    /// Returns `None` when a practice claim started without a ledger call.
    pub fn begin_start_claim(&mut self) -> Result<Option<PendingCall>, SessionError> {
        if self.latch.is_tripped() {
            return Err(SessionError::GameOver);
        }
        if let Some(in_flight) = self.claim.in_flight() {
            return Err(SessionError::Busy { in_flight });
        }
        let Some(session) = self.claim.check_start_claim(self.pending_yield)? else {
            self.claim.practice_claim_started();
            return Ok(None);
        };
        let ticket = self.claim.begin(LedgerOp::StartClaim)?;
        Ok(Some(PendingCall {
            ticket,
            request: LedgerRequest::StartClaim { session },
        }))
    }

    /// Reserve the `complete_harvest` call for the pending yield.
    pub fn begin_harvest(&mut self) -> Result<PendingCall, SessionError> {
        let session = self.claim.check_harvest(self.pending_yield)?;
        let ticket = self.claim.begin(LedgerOp::CompleteHarvest)?;
        Ok(PendingCall {
            ticket,
            request: LedgerRequest::CompleteHarvest {
                session,
                player: self.player,
                seeds: self.pending_yield,
            },
        })
    }

    // -----------------------------------------------------------------------
    // Ledger transitions, second half
    // -----------------------------------------------------------------------

    /// Apply the outcome of a ledger call reserved by a `begin_*` method.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Ledger`] for a failed call (state unchanged)
    /// and [`SessionError::ClaimExhausted`] when a claim drop found the
    /// remote countdown already used up. A failed `start_game` is not an
    /// error: the game continues offline.
    pub fn settle(
        &mut self,
        ticket: CallTicket,
        result: Result<LedgerResponse, LedgerError>,
    ) -> Result<Settlement, SessionError> {
        if !self.claim.finish(ticket) {
            return Ok(Settlement::Stale);
        }
        match ticket.op() {
            LedgerOp::StartGame => Ok(Settlement::GameStarted {
                session: self.settle_start_game(result),
            }),
            LedgerOp::DropFruit => self.settle_drop(result).map(Settlement::Dropped),
            LedgerOp::StartClaim => self
                .settle_start_claim(result)
                .map(|drops| Settlement::ClaimStarted { drops }),
            LedgerOp::CompleteHarvest => self.settle_harvest(result).map(Settlement::Harvested),
        }
    }

    fn settle_start_game(
        &mut self,
        result: Result<LedgerResponse, LedgerError>,
    ) -> Option<RemoteSessionId> {
        match result {
            Ok(LedgerResponse::GameStarted { session })
                if self.claim.state() != ClaimState::Idle =>
            {
                warn!(
                    player = %self.player,
                    %session,
                    state = %self.claim.state(),
                    "session opened after a practice claim began, staying offline"
                );
                None
            }
            Ok(LedgerResponse::GameStarted { session }) => {
                self.claim.attach_remote(session);
                info!(player = %self.player, %session, "game started online");
                Some(session)
            }
            Ok(other) => {
                warn!(?other, "unexpected start_game response, playing offline");
                None
            }
            Err(error) => {
                warn!(player = %self.player, %error, "start_game failed, playing offline");
                None
            }
        }
    }

    fn settle_drop(
        &mut self,
        result: Result<LedgerResponse, LedgerError>,
    ) -> Result<EntityDelta, SessionError> {
        let x = self.awaiting_drop_x.take();
        match result {
            Ok(LedgerResponse::FruitDropped {
                drop_count,
                claim_drops_left,
            }) => {
                debug!(drop_count, ?claim_drops_left, "claim drop confirmed");
                let x = x.unwrap_or(self.board.width / 2.0);
                let delta = self.perform_drop(x);
                self.claim.confirm_drop(claim_drops_left);
                Ok(delta)
            }
            Ok(other) => Err(unexpected(LedgerOp::DropFruit, &other)),
            Err(error) if error.is_no_drops_remaining() => {
                self.claim.reconcile_exhausted();
                Err(SessionError::ClaimExhausted)
            }
            Err(source) => {
                warn!(error = %source, "claim drop rejected by ledger");
                Err(SessionError::Ledger {
                    op: LedgerOp::DropFruit,
                    source,
                })
            }
        }
    }

    fn settle_start_claim(
        &mut self,
        result: Result<LedgerResponse, LedgerError>,
    ) -> Result<u8, SessionError> {
        match result {
            Ok(LedgerResponse::ClaimStarted { drops }) => {
                self.claim.claim_started(drops);
                Ok(drops)
            }
            Ok(other) => Err(unexpected(LedgerOp::StartClaim, &other)),
            Err(source) => {
                warn!(error = %source, "start_claim rejected by ledger");
                Err(SessionError::Ledger {
                    op: LedgerOp::StartClaim,
                    source,
                })
            }
        }
    }

    fn settle_harvest(
        &mut self,
        result: Result<LedgerResponse, LedgerError>,
    ) -> Result<HarvestReceipt, SessionError> {
        match result {
            Ok(LedgerResponse::HarvestCompleted { credited, balance }) => {
                let session = self
                    .claim
                    .remote()
                    .ok_or(SessionError::NoRemoteSession)?;
                let receipt = HarvestReceipt {
                    session,
                    seeds: credited,
                    balance,
                    harvested_at: Utc::now(),
                };
                self.harvested_total = self.harvested_total.saturating_add(credited);
                info!(
                    player = %self.player,
                    %session,
                    seeds = credited,
                    balance,
                    "seeds harvested"
                );
                self.reset();
                Ok(receipt)
            }
            Ok(other) => Err(unexpected(LedgerOp::CompleteHarvest, &other)),
            Err(source) => {
                warn!(error = %source, "complete_harvest rejected by ledger");
                Err(SessionError::Ledger {
                    op: LedgerOp::CompleteHarvest,
                    source,
                })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Physics-driven updates
    // -----------------------------------------------------------------------

    /// Feed collision events from the physics step, in arrival order.
    ///
    /// Returns one delta per merge. Once the game is over the board is
    /// frozen and collisions are ignored.
    pub fn on_collisions(
        &mut self,
        collisions: &[Collision],
        bodies: &dyn BodyQuery,
    ) -> Vec<EntityDelta> {
        if self.latch.is_tripped() || collisions.is_empty() {
            return Vec::new();
        }
        let now = self.clock.now_ms();
        apply_batch(&mut self.registry, collisions, bodies, now)
            .into_iter()
            .map(|outcome| {
                self.score = self.score.saturating_add(outcome.score);
                self.pending_yield = self.pending_yield.saturating_add(outcome.seeds);
                self.stats.merges = self.stats.merges.saturating_add(1);
                self.stats.highest_rank = self.stats.highest_rank.max(outcome.produced);
                outcome.delta
            })
            .collect()
    }

    /// Run the game-over check for this tick.
    ///
    /// Returns the event on the tick the game ends. Ending the game forfeits
    /// a running claim and drops the remote session unless the claim has
    /// already completed.
    pub fn tick(&mut self, bodies: &dyn BodyQuery) -> Option<GameOverEvent> {
        let now = self.clock.now_ms();
        let event = self
            .latch
            .evaluate(&self.registry, bodies, now, &self.game_over_rule)?;
        if self.claim.on_game_over() {
            warn!(
                player = %self.player,
                pending_yield = self.pending_yield,
                "claim forfeited by game over"
            );
        }
        self.awaiting_drop_x = None;
        Some(event)
    }

    /// Discard the current game and start over offline.
    ///
    /// The harvested total and the RNG stream carry over.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.score = 0;
        self.pending_yield = 0;
        self.latch.reset();
        self.claim.reset();
        self.stats = GameStats::default();
        self.last_drop_ms = None;
        self.awaiting_drop_x = None;
    }

    fn perform_drop(&mut self, x: f32) -> EntityDelta {
        let now = self.clock.now_ms();
        let rank = self.next_rank;
        let radius = radius_for(rank);
        let x = self.clamp_x(x, radius);
        let id = self.registry.insert(rank, now);

        self.next_rank = roll_rank(&mut self.rng, self.rules.max_spawn_rank);
        self.stats.drops = self.stats.drops.saturating_add(1);
        self.stats.highest_rank = self.stats.highest_rank.max(rank);
        self.last_drop_ms = Some(now);
        debug!(%id, rank = rank.get(), x, "fruit dropped");

        EntityDelta {
            removed: Vec::new(),
            spawned: vec![SpawnedEntity {
                id,
                rank,
                position: Point::new(x, self.board.drop_y),
                radius,
            }],
        }
    }

    fn clamp_x(&self, x: f32, radius: f32) -> f32 {
        let width = self.board.width;
        if !x.is_finite() {
            return width / 2.0;
        }
        let high = (width - radius).max(radius);
        x.clamp(radius, high)
    }

    // -----------------------------------------------------------------------
    // Inline wrappers
    // -----------------------------------------------------------------------

    /// Start a fresh game and wait for the ledger.
    ///
    /// Returns the remote session, or `None` if the game is offline.
    pub async fn start_game(&mut self) -> Result<Option<RemoteSessionId>, SessionError> {
        let call = self.begin_start_game()?;
        let result = self.execute_inline(&call).await;
        Ok(self.settle_start_game(result))
    }

    /// Drop a fruit at `x`, waiting for ledger confirmation if required.
    pub async fn drop_at(&mut self, x: f32) -> Result<EntityDelta, SessionError> {
        match self.request_drop(x)? {
            DropOutcome::Dropped(delta) => Ok(delta),
            DropOutcome::AwaitingLedger(call) => {
                let result = self.execute_inline(&call).await;
                self.settle_drop(result)
            }
        }
    }

    /// Start the claim countdown and wait for the ledger.
    ///
    /// Returns the countdown length.
    pub async fn start_claim(&mut self) -> Result<u8, SessionError> {
        match self.begin_start_claim()? {
            None => Ok(self.claim.drops_remaining()),
            Some(call) => {
                let result = self.execute_inline(&call).await;
                self.settle_start_claim(result)
            }
        }
    }

    /// Redeem the pending yield and wait for the ledger.
    pub async fn harvest(&mut self) -> Result<HarvestReceipt, SessionError> {
        let call = self.begin_harvest()?;
        let result = self.execute_inline(&call).await;
        self.settle_harvest(result)
    }

    /// Execute a reserved call while holding the controller exclusively, so
    /// the ticket cannot go stale before it is released.
    async fn execute_inline(&mut self, call: &PendingCall) -> Result<LedgerResponse, LedgerError> {
        let result = self.ledger.execute(&call.request).await;
        self.claim.finish(call.ticket);
        result
    }
}

fn roll_rank(rng: &mut StdRng, max_spawn_rank: u8) -> Rank {
    let max = max_spawn_rank.clamp(Rank::MIN.get(), Rank::MAX.get());
    Rank::new(rng.random_range(Rank::MIN.get()..=max)).unwrap_or(Rank::MIN)
}

fn unexpected(op: LedgerOp, response: &LedgerResponse) -> SessionError {
    SessionError::Ledger {
        op,
        source: LedgerError::UnexpectedResponse {
            op,
            detail: format!("got {} reply", response.op()),
        },
    }
}

