//! Seams to the rigid-body physics collaborator.
//!
//! Physics is not simulated here. The core reads body state through
//! [`BodyQuery`] (merge spawn points, game-over checks) and the runner
//! drives a [`PhysicsWorld`]: it feeds entity deltas in and receives
//! collision events out, once per contact.

use seedfall_types::{BodyState, Collision, EntityDelta, EntityId};

/// Read-only access to the physics collaborator's bodies.
pub trait BodyQuery {
    /// Current state of the body backing `id`, if the body exists.
    fn body(&self, id: EntityId) -> Option<BodyState>;
}

/// A physics world the session runner can step.
pub trait PhysicsWorld: BodyQuery {
    /// Create and destroy bodies to mirror an entity delta.
    fn apply(&mut self, delta: &EntityDelta);

    /// Advance the simulation by `dt_ms` and return the contacts that began
    /// during the step, in the order they were detected.
    fn step(&mut self, dt_ms: u64) -> Vec<Collision>;

    /// Destroy every body.
    fn clear(&mut self);
}

/// A body query with no bodies, for callers without a physics world.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBodies;

impl BodyQuery for NoBodies {
    fn body(&self, _id: EntityId) -> Option<BodyState> {
        None
    }
}

impl<T: BodyQuery + ?Sized> BodyQuery for &T {
    fn body(&self, id: EntityId) -> Option<BodyState> {
        (**self).body(id)
    }
}

impl BodyQuery for std::collections::BTreeMap<EntityId, BodyState> {
    fn body(&self, id: EntityId) -> Option<BodyState> {
        self.get(&id).copied()
    }
}
