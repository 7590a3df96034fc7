//! Game-over detection.
//!
//! A disc ends the game when it has existed longer than the dwell time and
//! is resting above the danger line. The first such disc trips a latch that
//! stays tripped until an explicit reset; once tripped, later ticks do not
//! scan the registry at all.

use tracing::info;

use seedfall_types::{BodyState, Entity, EntityId, Rank};

use crate::config::GameConfig;
use crate::physics::BodyQuery;
use crate::registry::EntityRegistry;

/// Thresholds of the terminal condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameOverRule {
    /// Minimum age of a disc before it can end the game.
    pub dwell_ms: u64,
    /// Discs whose centre is above this line (smaller `y`) are in danger.
    pub danger_zone_y: f32,
    /// Per-axis speed below which a disc counts as resting.
    pub settle_velocity: f32,
}

impl GameOverRule {
    /// Build the rule from configuration.
    pub const fn from_config(config: &GameConfig) -> Self {
        Self {
            dwell_ms: config.rules.dwell_ms,
            danger_zone_y: config.board.danger_zone_y,
            settle_velocity: config.rules.settle_velocity,
        }
    }

    /// Whether `entity`, with physics state `body`, meets the terminal
    /// condition at `now_ms`.
    pub fn is_terminal(&self, entity: &Entity, body: &BodyState, now_ms: u64) -> bool {
        now_ms.saturating_sub(entity.spawned_at_ms) > self.dwell_ms
            && body.position.y < self.danger_zone_y
            && body.velocity.x.abs() < self.settle_velocity
            && body.velocity.y.abs() < self.settle_velocity
    }
}

impl Default for GameOverRule {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

/// The disc that ended the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOverEvent {
    /// The disc that met the terminal condition.
    pub trigger: EntityId,
    /// Its rank.
    pub rank: Rank,
    /// Clock reading when the latch tripped.
    pub at_ms: u64,
}

/// Monotonic game-over latch.
#[derive(Debug, Clone, Default)]
pub struct GameOverLatch {
    tripped: Option<GameOverEvent>,
}

impl GameOverLatch {
    /// Create an untripped latch.
    pub const fn new() -> Self {
        Self { tripped: None }
    }

    /// Whether the game is over.
    pub const fn is_tripped(&self) -> bool {
        self.tripped.is_some()
    }

    /// The event that tripped the latch.
    pub const fn event(&self) -> Option<&GameOverEvent> {
        self.tripped.as_ref()
    }

    /// Scan the registry once.
    ///
    /// Returns the event only on the tick the latch trips; returns `None`
    /// both while the game is still running and after it has ended.
    pub fn evaluate(
        &mut self,
        registry: &EntityRegistry,
        bodies: &dyn BodyQuery,
        now_ms: u64,
        rule: &GameOverRule,
    ) -> Option<GameOverEvent> {
        if self.tripped.is_some() {
            return None;
        }

        let event = registry.iter().find_map(|entity| {
            let body = bodies.body(entity.id)?;
            rule.is_terminal(entity, &body, now_ms).then_some(GameOverEvent {
                trigger: entity.id,
                rank: entity.rank,
                at_ms: now_ms,
            })
        })?;

        info!(
            trigger = %event.trigger,
            rank = event.rank.get(),
            at_ms = event.at_ms,
            "game over latched"
        );
        self.tripped = Some(event);
        Some(event)
    }

    /// Re-arm the latch for a new game.
    pub fn reset(&mut self) {
        self.tripped = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use seedfall_types::Point;

    use super::*;

    fn resting_at(y: f32) -> BodyState {
        BodyState {
            position: Point::new(200.0, y),
            velocity: Point::new(0.2, -0.3),
        }
    }

    fn setup(spawned_at_ms: u64, body: BodyState) -> (EntityRegistry, BTreeMap<EntityId, BodyState>) {
        let mut registry = EntityRegistry::new();
        let id = registry.insert(Rank::MIN, spawned_at_ms);
        let mut bodies = BTreeMap::new();
        bodies.insert(id, body);
        (registry, bodies)
    }

    #[test]
    fn resting_disc_above_line_after_dwell_ends_game() {
        let rule = GameOverRule::default();
        let (registry, bodies) = setup(0, resting_at(50.0));
        let mut latch = GameOverLatch::new();

        assert!(latch.evaluate(&registry, &bodies, 2_000, &rule).is_none());
        let event = latch.evaluate(&registry, &bodies, 2_001, &rule).unwrap();
        assert_eq!(event.at_ms, 2_001);
        assert!(latch.is_tripped());
    }

    #[test]
    fn moving_or_low_discs_are_safe() {
        let rule = GameOverRule::default();
        let mut latch = GameOverLatch::new();

        let falling = BodyState {
            position: Point::new(200.0, 50.0),
            velocity: Point::new(0.0, 4.0),
        };
        let (registry, bodies) = setup(0, falling);
        assert!(latch.evaluate(&registry, &bodies, 10_000, &rule).is_none());

        let (registry, bodies) = setup(0, resting_at(300.0));
        assert!(latch.evaluate(&registry, &bodies, 10_000, &rule).is_none());
        assert!(!latch.is_tripped());
    }

    #[test]
    fn latch_is_monotonic_until_reset() {
        let rule = GameOverRule::default();
        let (mut registry, bodies) = setup(0, resting_at(10.0));
        let mut latch = GameOverLatch::new();
        assert!(latch.evaluate(&registry, &bodies, 5_000, &rule).is_some());

        // The danger disc leaves; the latch stays tripped and does not refire.
        registry.clear();
        assert!(latch.evaluate(&registry, &bodies, 6_000, &rule).is_none());
        assert!(latch.is_tripped());

        latch.reset();
        assert!(!latch.is_tripped());
    }

    #[test]
    fn disc_without_body_is_ignored() {
        let rule = GameOverRule::default();
        let mut registry = EntityRegistry::new();
        registry.insert(Rank::MIN, 0);
        let bodies: BTreeMap<EntityId, BodyState> = BTreeMap::new();
        let mut latch = GameOverLatch::new();
        assert!(latch.evaluate(&registry, &bodies, 60_000, &rule).is_none());
    }
}
