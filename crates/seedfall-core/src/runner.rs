//! Headless session loop.
//!
//! [`run_session`] drives one game: it steps the physics world on a fixed
//! interval, feeds collisions and game-over checks to the controller, asks
//! a [`DropPolicy`] what to do next, and reports changes to a
//! [`SessionObserver`].
//!
//! Ledger calls never block the loop. Each reserved call is executed on
//! its own tokio task and the outcome comes back over an mpsc channel,
//! where it is settled between ticks.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use seedfall_ledger::{LedgerBackend, LedgerError, LedgerResponse};
use seedfall_types::{HarvestReceipt, SessionSnapshot};

use crate::claim::CallTicket;
use crate::config::EngineConfig;
use crate::observer::SessionObserver;
use crate::physics::PhysicsWorld;
use crate::session::{DropOutcome, PendingCall, SessionController, Settlement};

/// Errors that end a run early.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The settlement channel closed while the loop was still running.
    #[error("ledger settlement channel closed")]
    ChannelClosed,
}

/// What the policy wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Drop the next fruit at this horizontal position.
    Drop {
        /// Horizontal position in container units.
        x: f32,
    },
    /// Start the claim countdown.
    StartClaim,
    /// Redeem the completed claim.
    Harvest,
    /// End the run.
    Stop,
}

/// Decides the player's moves.
pub trait DropPolicy: Send {
    /// Choose a command for `tick`, or `None` to wait.
    fn decide(&mut self, tick: u64, snapshot: &SessionSnapshot) -> Option<Command>;
}

/// A policy that never acts. Runs using it end on the tick limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubPolicy;

impl DropPolicy for StubPolicy {
    fn decide(&mut self, _tick: u64, _snapshot: &SessionSnapshot) -> Option<Command> {
        None
    }
}

/// Limits and pacing of a run.
///
/// A run also ends [`HARVEST_GRACE_TICKS`] after game over when a
/// completed claim is left unharvested, so an unlimited run always ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBounds {
    /// Time between ticks, also the physics step.
    pub tick_interval_ms: u64,
    /// Stop after this many ticks. Zero means unlimited.
    pub max_ticks: u64,
}

impl RunBounds {
    /// Bounds from the `engine` configuration section.
    pub const fn from_config(config: &EngineConfig) -> Self {
        Self {
            tick_interval_ms: config.tick_interval_ms,
            max_ticks: config.max_ticks,
        }
    }

    const fn tick_limit_reached(&self, ticks: u64) -> bool {
        self.max_ticks > 0 && ticks >= self.max_ticks
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The game ended and nothing was left to harvest.
    GameOver,
    /// Seeds were harvested.
    Harvested,
    /// The game ended with a completed claim the policy did not harvest
    /// within [`HARVEST_GRACE_TICKS`].
    HarvestAbandoned,
    /// The tick limit was reached.
    MaxTicksReached,
    /// The policy asked to stop.
    PolicyStop,
}

/// Outcome of [`run_session`].
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// Ticks executed.
    pub total_ticks: u64,
    /// Session state when the run ended.
    pub final_snapshot: SessionSnapshot,
    /// The harvest receipt, when the run ended by harvesting.
    pub harvested: Option<HarvestReceipt>,
}

/// Ticks a policy gets to harvest a completed claim after game over.
pub const HARVEST_GRACE_TICKS: u64 = 300;

type SettledCall = (CallTicket, Result<LedgerResponse, LedgerError>);

/// Play one game from `start_game` until it ends.
///
/// # Errors
///
/// Returns [`RunnerError`] if the settlement channel fails.
pub async fn run_session<P: PhysicsWorld>(
    controller: &mut SessionController,
    physics: &mut P,
    policy: &mut dyn DropPolicy,
    observer: &mut dyn SessionObserver,
    bounds: RunBounds,
) -> Result<RunResult, RunnerError> {
    let (tx, mut rx) = mpsc::channel::<SettledCall>(4);
    let mut interval = tokio::time::interval(Duration::from_millis(bounds.tick_interval_ms.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    physics.clear();
    match controller.begin_start_game() {
        Ok(call) => spawn_call(controller.ledger(), call, &tx),
        Err(error) => warn!(%error, "could not start game online"),
    }

    let mut last_snapshot = controller.snapshot();
    observer.on_snapshot_changed(&last_snapshot);
    let mut total_ticks: u64 = 0;
    let mut game_over_tick: Option<u64> = None;

    info!(
        player = %controller.player(),
        ledger = controller.ledger().name(),
        tick_interval_ms = bounds.tick_interval_ms,
        max_ticks = bounds.max_ticks,
        "session starting"
    );

    loop {
        tokio::select! {
            settled = rx.recv() => {
                let Some((ticket, result)) = settled else {
                    return Err(RunnerError::ChannelClosed);
                };
                match controller.settle(ticket, result) {
                    Ok(Settlement::Dropped(delta)) => {
                        physics.apply(&delta);
                        observer.on_entities_changed(&delta);
                    }
                    Ok(Settlement::Harvested(receipt)) => {
                        physics.clear();
                        observer.on_seeds_harvested(&receipt);
                        let final_snapshot = controller.snapshot();
                        observer.on_snapshot_changed(&final_snapshot);
                        return Ok(finish(RunEndReason::Harvested, total_ticks, final_snapshot, Some(receipt)));
                    }
                    Ok(settlement) => debug!(?settlement, "ledger call settled"),
                    Err(error) => warn!(%error, "ledger transition failed"),
                }
                publish(controller, observer, &mut last_snapshot);
            }
            _ = interval.tick() => {
                total_ticks = total_ticks.saturating_add(1);

                let collisions = physics.step(bounds.tick_interval_ms);
                for delta in controller.on_collisions(&collisions, &*physics) {
                    physics.apply(&delta);
                    observer.on_entities_changed(&delta);
                }
                controller.tick(&*physics);

                let snapshot = controller.snapshot();
                if let Some(command) = policy.decide(total_ticks, &snapshot) {
                    if command == Command::Stop {
                        info!(tick = total_ticks, "policy requested stop");
                        return Ok(finish(RunEndReason::PolicyStop, total_ticks, snapshot, None));
                    }
                    apply_command(controller, physics, observer, command, &tx);
                }
                publish(controller, observer, &mut last_snapshot);

                if last_snapshot.is_game_over {
                    let since = *game_over_tick.get_or_insert(total_ticks);
                    if last_snapshot.in_flight.is_none() {
                        if !last_snapshot.can_harvest() {
                            info!(tick = total_ticks, score = last_snapshot.score, "game over");
                            return Ok(finish(RunEndReason::GameOver, total_ticks, last_snapshot, None));
                        }
                        if total_ticks.saturating_sub(since) >= HARVEST_GRACE_TICKS {
                            warn!(
                                tick = total_ticks,
                                pending_yield = last_snapshot.pending_yield,
                                "completed claim left unharvested after game over"
                            );
                            return Ok(finish(
                                RunEndReason::HarvestAbandoned,
                                total_ticks,
                                last_snapshot,
                                None,
                            ));
                        }
                    }
                }
                if bounds.tick_limit_reached(total_ticks) {
                    info!(tick = total_ticks, max_ticks = bounds.max_ticks, "tick limit reached");
                    return Ok(finish(RunEndReason::MaxTicksReached, total_ticks, last_snapshot, None));
                }
            }
        }
    }
}

/// Log the end of a run.
pub fn log_run_end(result: &RunResult) {
    let snapshot = &result.final_snapshot;
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        score = snapshot.score,
        pending_yield = snapshot.pending_yield,
        merges = snapshot.merges,
        drops = snapshot.drops,
        highest_rank = snapshot.highest_rank.get(),
        "session ended"
    );
    match &result.harvested {
        Some(receipt) => info!(
            session = %receipt.session,
            seeds = receipt.seeds,
            balance = receipt.balance,
            "harvest receipt"
        ),
        None if snapshot.pending_yield > 0 => {
            warn!(pending_yield = snapshot.pending_yield, "session ended with unredeemed seeds");
        }
        None => {}
    }
}

fn apply_command<P: PhysicsWorld>(
    controller: &mut SessionController,
    physics: &mut P,
    observer: &mut dyn SessionObserver,
    command: Command,
    tx: &mpsc::Sender<SettledCall>,
) {
    let reserved = match command {
        Command::Drop { x } => controller.request_drop(x).map(|outcome| match outcome {
            DropOutcome::Dropped(delta) => {
                physics.apply(&delta);
                observer.on_entities_changed(&delta);
                None
            }
            DropOutcome::AwaitingLedger(call) => Some(call),
        }),
        Command::StartClaim => controller.begin_start_claim(),
        Command::Harvest => controller.begin_harvest().map(Some),
        Command::Stop => Ok(None),
    };
    match reserved {
        Ok(Some(call)) => spawn_call(controller.ledger(), call, tx),
        Ok(None) => {}
        Err(error) => debug!(?command, %error, "command rejected"),
    }
}

fn spawn_call(ledger: &LedgerBackend, call: PendingCall, tx: &mpsc::Sender<SettledCall>) {
    let ledger = ledger.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = ledger.execute(&call.request).await;
        if tx.send((call.ticket, result)).await.is_err() {
            debug!(op = %call.ticket.op(), "run finished before ledger call settled");
        }
    });
}

fn publish(
    controller: &SessionController,
    observer: &mut dyn SessionObserver,
    last: &mut SessionSnapshot,
) {
    let snapshot = controller.snapshot();
    if snapshot != *last {
        observer.on_snapshot_changed(&snapshot);
        *last = snapshot;
    }
}

const fn finish(
    end_reason: RunEndReason,
    total_ticks: u64,
    final_snapshot: SessionSnapshot,
    harvested: Option<HarvestReceipt>,
) -> RunResult {
    RunResult {
        end_reason,
        total_ticks,
        final_snapshot,
        harvested,
    }
}
