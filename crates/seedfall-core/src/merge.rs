//! Merge engine.
//!
//! Consumes collision events in arrival order. Two live discs of equal rank
//! below the maximum are replaced by one disc of the next rank; everything
//! else is a purely physical contact and is ignored. Removal is immediate,
//! so a later event in the same batch that names an already consumed disc
//! finds it missing and is skipped.

use tracing::debug;

use seedfall_types::{Collision, EntityDelta, Point, Rank, SpawnedEntity};

use crate::physics::BodyQuery;
use crate::rank::{merge_score, radius_for, yield_for};
use crate::registry::EntityRegistry;

/// What a single merge produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// Removed inputs and the spawned product, for physics and rendering.
    pub delta: EntityDelta,
    /// Rank of the product.
    pub produced: Rank,
    /// Score awarded.
    pub score: u64,
    /// Seeds added to the pending yield.
    pub seeds: u64,
}

/// Apply the merge rule to one collision.
///
/// Returns `None` when either disc is gone, the ranks differ, the discs are
/// already at the maximum rank, or both ends name the same disc.
pub fn apply_collision(
    registry: &mut EntityRegistry,
    collision: Collision,
    bodies: &dyn BodyQuery,
    now_ms: u64,
) -> Option<MergeOutcome> {
    let Collision { a, b } = collision;
    if a == b {
        return None;
    }

    let rank_a = registry.get(a)?.rank;
    let rank_b = registry.get(b)?.rank;
    if rank_a != rank_b {
        return None;
    }
    let produced = rank_a.next()?;

    let position = spawn_point(bodies, collision);
    registry.remove(a)?;
    registry.remove(b)?;
    let id = registry.insert(produced, now_ms);

    let score = merge_score(produced);
    let seeds = yield_for(produced);
    debug!(%a, %b, %id, rank = produced.get(), score, seeds, "fruits merged");

    Some(MergeOutcome {
        delta: EntityDelta {
            removed: vec![a, b],
            spawned: vec![SpawnedEntity {
                id,
                rank: produced,
                position,
                radius: radius_for(produced),
            }],
        },
        produced,
        score,
        seeds,
    })
}

/// Apply the merge rule to a batch of collisions, strictly in order.
pub fn apply_batch(
    registry: &mut EntityRegistry,
    collisions: &[Collision],
    bodies: &dyn BodyQuery,
    now_ms: u64,
) -> Vec<MergeOutcome> {
    collisions
        .iter()
        .filter_map(|&collision| apply_collision(registry, collision, bodies, now_ms))
        .collect()
}

/// Midpoint of the two colliding bodies, or whichever one physics still
/// knows about.
fn spawn_point(bodies: &dyn BodyQuery, collision: Collision) -> Point {
    match (bodies.body(collision.a), bodies.body(collision.b)) {
        (Some(a), Some(b)) => a.position.midpoint(b.position),
        (Some(only), None) | (None, Some(only)) => only.position,
        (None, None) => Point::default(),
    }
}
