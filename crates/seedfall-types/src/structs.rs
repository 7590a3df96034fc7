//! Core structs: geometry read from the physics collaborator, entities,
//! render deltas, session snapshots, and harvest receipts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ClaimState, LedgerOp};
use crate::ids::{EntityId, RemoteSessionId};
use crate::rank::Rank;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// A 2D point or vector in container units. `y` grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate, zero at the top of the container.
    pub y: f32,
}

impl Point {
    /// Construct a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Midpoint between two points.
    pub fn midpoint(self, other: Self) -> Self {
        Self {
            x: (self.x + other.x) * 0.5,
            y: (self.y + other.y) * 0.5,
        }
    }
}

/// Position and velocity of one body, as reported by the physics
/// collaborator. Read-only to the game core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BodyState {
    /// Centre of the body.
    pub position: Point,
    /// Current velocity.
    pub velocity: Point,
}

/// A contact between two bodies reported by the physics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Collision {
    /// First body in the contact.
    pub a: EntityId,
    /// Second body in the contact.
    pub b: EntityId,
}

impl Collision {
    /// Construct a collision event.
    pub const fn new(a: EntityId, b: EntityId) -> Self {
        Self { a, b }
    }
}

// ---------------------------------------------------------------------------
// Entities and deltas
// ---------------------------------------------------------------------------

/// One disc in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Registry handle.
    pub id: EntityId,
    /// Merge tier.
    pub rank: Rank,
    /// Monotonic clock reading, in milliseconds, when the disc was created.
    pub spawned_at_ms: u64,
}

/// A disc that the physics and render layers should create.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SpawnedEntity {
    /// Registry handle of the new disc.
    pub id: EntityId,
    /// Merge tier of the new disc.
    pub rank: Rank,
    /// Where the disc appears.
    pub position: Point,
    /// Physical radius of the disc.
    pub radius: f32,
}

/// Change to the live entity set produced by a drop or a merge.
///
/// Advisory only: the registry remains the state of record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityDelta {
    /// Discs that left play.
    pub removed: Vec<EntityId>,
    /// Discs that entered play.
    pub spawned: Vec<SpawnedEntity>,
}

impl EntityDelta {
    /// Whether the delta carries no change.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.spawned.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Session snapshot
// ---------------------------------------------------------------------------

/// Immutable view of a game session, produced after every mutation.
///
/// UI layers diff consecutive snapshots instead of observing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SessionSnapshot {
    /// Points earned by merges this game.
    pub score: u64,
    /// Seeds earned this game and not yet redeemed.
    pub pending_yield: u64,
    /// Whether the game-over latch has tripped.
    pub is_game_over: bool,
    /// Redemption protocol state.
    pub claim_state: ClaimState,
    /// Drops left before a running claim completes.
    pub drops_remaining: u8,
    /// Remote ledger session, absent in offline mode.
    pub remote_session: Option<RemoteSessionId>,
    /// Ledger call currently awaiting settlement, if any.
    pub in_flight: Option<LedgerOp>,
    /// Rank of the fruit the next drop will release.
    pub next_rank: Rank,
    /// Number of discs in play.
    pub entity_count: u32,
    /// Highest rank reached this game.
    pub highest_rank: Rank,
    /// Merges performed this game.
    pub merges: u32,
    /// Fruits dropped this game.
    pub drops: u32,
    /// Seeds credited to the player by harvests since the controller was
    /// created.
    pub harvested_total: u64,
}

impl SessionSnapshot {
    /// Whether the game is mirrored on the remote ledger.
    pub const fn is_online(&self) -> bool {
        self.remote_session.is_some()
    }

    /// Whether a harvest request would currently pass local validation.
    pub const fn can_harvest(&self) -> bool {
        matches!(self.claim_state, ClaimState::Completed)
            && self.pending_yield > 0
            && self.remote_session.is_some()
            && self.in_flight.is_none()
    }
}

// ---------------------------------------------------------------------------
// Harvest receipt
// ---------------------------------------------------------------------------

/// Confirmation that a harvest credited seeds to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HarvestReceipt {
    /// Remote session that was closed by the harvest.
    pub session: RemoteSessionId,
    /// Seeds credited by this harvest.
    pub seeds: u64,
    /// Player balance on the ledger after the credit.
    pub balance: u64,
    /// Wall-clock time the harvest settled.
    pub harvested_at: DateTime<Utc>,
}
