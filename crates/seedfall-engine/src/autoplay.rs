//! Autoplay policy for headless sessions.
//!
//! Drops fruits at random positions on a fixed cadence, starts a claim
//! once enough seeds are pending, plays out the countdown, and harvests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use seedfall_core::runner::{Command, DropPolicy};
use seedfall_types::{ClaimState, SessionSnapshot};

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Autoplay settings, read from the `autoplay` section of
/// `seedfall-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AutoplayConfig {
    /// Ticks between two drop attempts.
    #[serde(default = "default_drop_every_ticks")]
    pub drop_every_ticks: u64,

    /// Pending seeds at which the player starts a claim.
    #[serde(default = "default_claim_threshold")]
    pub claim_threshold: u64,

    /// Seed for drop positions.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            drop_every_ticks: default_drop_every_ticks(),
            claim_threshold: default_claim_threshold(),
            seed: default_seed(),
        }
    }
}

const fn default_drop_every_ticks() -> u64 {
    40
}

const fn default_claim_threshold() -> u64 {
    4
}

const fn default_seed() -> u64 {
    7
}

// -----------------------------------------------------------------------
// Policy
// -----------------------------------------------------------------------

/// Scripted player.
#[derive(Debug, Clone)]
pub struct AutoPlayer {
    config: AutoplayConfig,
    width: f32,
    rng: StdRng,
}

impl AutoPlayer {
    /// Create a player for a container `width` units wide.
    pub fn new(config: AutoplayConfig, width: f32) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, width, rng }
    }

    fn wants_claim(&self, snapshot: &SessionSnapshot) -> bool {
        snapshot.claim_state == ClaimState::Idle
            && snapshot.is_online()
            && snapshot.pending_yield >= self.config.claim_threshold.max(1)
    }
}

impl DropPolicy for AutoPlayer {
    fn decide(&mut self, tick: u64, snapshot: &SessionSnapshot) -> Option<Command> {
        if snapshot.in_flight.is_some() {
            return None;
        }
        if snapshot.can_harvest() {
            return Some(Command::Harvest);
        }
        if snapshot.is_game_over {
            return None;
        }
        if self.wants_claim(snapshot) {
            return Some(Command::StartClaim);
        }
        if snapshot.claim_state == ClaimState::Completed {
            return None;
        }
        if tick.checked_rem(self.config.drop_every_ticks.max(1)) != Some(0) {
            return None;
        }
        let x = self.rng.random_range(0.0..self.width.max(1.0));
        Some(Command::Drop { x })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use seedfall_types::{LedgerOp, Rank, RemoteSessionId};

    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            score: 0,
            pending_yield: 0,
            is_game_over: false,
            claim_state: ClaimState::Idle,
            drops_remaining: 0,
            remote_session: Some(RemoteSessionId(1)),
            in_flight: None,
            next_rank: Rank::MIN,
            entity_count: 0,
            highest_rank: Rank::MIN,
            merges: 0,
            drops: 0,
            harvested_total: 0,
        }
    }

    #[test]
    fn drops_on_cadence_within_container() {
        let mut player = AutoPlayer::new(AutoplayConfig::default(), 400.0);
        assert_eq!(player.decide(1, &snapshot()), None);
        let Some(Command::Drop { x }) = player.decide(40, &snapshot()) else {
            panic!("expected a drop on tick 40");
        };
        assert!((0.0..400.0).contains(&x));
    }

    #[test]
    fn claims_at_threshold_then_harvests() {
        let mut player = AutoPlayer::new(AutoplayConfig::default(), 400.0);
        let mut snap = snapshot();
        snap.pending_yield = 4;
        assert_eq!(player.decide(3, &snap), Some(Command::StartClaim));

        snap.in_flight = Some(LedgerOp::StartClaim);
        assert_eq!(player.decide(4, &snap), None);

        snap.in_flight = None;
        snap.claim_state = ClaimState::Completed;
        assert_eq!(player.decide(5, &snap), Some(Command::Harvest));
    }

    #[test]
    fn waits_after_game_over() {
        let mut player = AutoPlayer::new(AutoplayConfig::default(), 400.0);
        let mut snap = snapshot();
        snap.is_game_over = true;
        assert_eq!(player.decide(40, &snap), None);
    }
}
