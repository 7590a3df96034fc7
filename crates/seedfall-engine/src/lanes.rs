//! Lane physics: a headless stand-in for the rigid-body world.
//!
//! The container is split into vertical lanes. A disc falls straight down
//! its lane under constant gravity and comes to rest on top of the lane's
//! stack. Contacts are reported once, at landing, against the disc below
//! and against the top discs of the neighbouring lanes when they overlap
//! vertically. Removing a disc releases everything stacked above it.
//!
//! This is not a physics integrator. It exists so the headless engine can
//! play whole games with believable merge chains and a board that fills up.

use std::collections::BTreeMap;

use seedfall_core::config::BoardConfig;
use seedfall_core::physics::{BodyQuery, PhysicsWorld};
use seedfall_types::{BodyState, Collision, EntityDelta, EntityId, Point};

/// Nominal lane width in container units.
const LANE_WIDTH: f32 = 50.0;

/// Downward acceleration in container units per ms².
const GRAVITY: f32 = 0.002;

#[derive(Debug, Clone, Copy)]
struct LaneBody {
    lane: usize,
    radius: f32,
    position: Point,
    velocity: Point,
    resting: bool,
}

/// Lane-stacking physics world.
#[derive(Debug, Clone)]
pub struct LanePhysics {
    lane_width: f32,
    floor_y: f32,
    lanes: Vec<Vec<EntityId>>,
    bodies: BTreeMap<EntityId, LaneBody>,
}

impl LanePhysics {
    /// Create an empty world sized to `board`.
    pub fn new(board: &BoardConfig) -> Self {
        let count = lane_count(board.width);
        Self {
            lane_width: board.width / count_as_f32(count),
            floor_y: board.floor_y,
            lanes: vec![Vec::new(); count],
            bodies: BTreeMap::new(),
        }
    }

    /// Number of lanes.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    fn lane_of(&self, x: f32) -> usize {
        let last = self.lanes.len().saturating_sub(1);
        if !x.is_finite() || x <= 0.0 {
            return 0;
        }
        let lane = (x / self.lane_width).floor();
        // The container is at most a few thousand units wide.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let lane = lane as usize;
        lane.min(last)
    }

    /// Height at which a disc of `radius` rests on top of `lane`.
    fn rest_y(&self, lane: usize, radius: f32) -> f32 {
        let top = self
            .lanes
            .get(lane)
            .and_then(|stack| stack.last())
            .and_then(|id| self.bodies.get(id))
            .map_or(self.floor_y, |below| below.position.y - below.radius);
        top - radius
    }

    /// Take every disc above `id` off its lane so it falls again.
    fn release_above(&mut self, lane: usize, id: EntityId) {
        let Some(stack) = self.lanes.get_mut(lane) else {
            return;
        };
        let Some(pos) = stack.iter().position(|other| *other == id) else {
            return;
        };
        let released = stack.split_off(pos);
        for other in released.into_iter().skip(1) {
            if let Some(body) = self.bodies.get_mut(&other) {
                body.resting = false;
            }
        }
    }

    fn land(&mut self, id: EntityId, contacts: &mut Vec<Collision>) {
        let Some(body) = self.bodies.get(&id).copied() else {
            return;
        };
        let rest = self.rest_y(body.lane, body.radius);

        if let Some(below) = self.lanes.get(body.lane).and_then(|stack| stack.last()) {
            contacts.push(Collision::new(*below, id));
        }
        for neighbour in [body.lane.checked_sub(1), body.lane.checked_add(1)]
            .into_iter()
            .flatten()
        {
            let Some(top) = self.lanes.get(neighbour).and_then(|stack| stack.last()) else {
                continue;
            };
            if let Some(other) = self.bodies.get(top) {
                if (other.position.y - rest).abs() < other.radius + body.radius {
                    contacts.push(Collision::new(*top, id));
                }
            }
        }

        if let Some(stack) = self.lanes.get_mut(body.lane) {
            stack.push(id);
        }
        if let Some(body) = self.bodies.get_mut(&id) {
            body.position.y = rest;
            body.velocity = Point::default();
            body.resting = true;
        }
    }
}

impl BodyQuery for LanePhysics {
    fn body(&self, id: EntityId) -> Option<BodyState> {
        self.bodies.get(&id).map(|body| BodyState {
            position: body.position,
            velocity: body.velocity,
        })
    }
}

impl PhysicsWorld for LanePhysics {
    fn apply(&mut self, delta: &EntityDelta) {
        for id in &delta.removed {
            if let Some(body) = self.bodies.get(id).copied() {
                if body.resting {
                    self.release_above(body.lane, *id);
                }
                self.bodies.remove(id);
            }
        }
        for spawned in &delta.spawned {
            let lane = self.lane_of(spawned.position.x);
            self.bodies.insert(
                spawned.id,
                LaneBody {
                    lane,
                    radius: spawned.radius,
                    position: spawned.position,
                    velocity: Point::default(),
                    resting: false,
                },
            );
        }
    }

    fn step(&mut self, dt_ms: u64) -> Vec<Collision> {
        #[allow(clippy::cast_precision_loss)]
        let dt = dt_ms as f32;

        // Lowest falling disc first, so a released stack lands in order.
        let mut falling: Vec<(EntityId, f32)> = self
            .bodies
            .iter()
            .filter(|(_, body)| !body.resting)
            .map(|(id, body)| (*id, body.position.y))
            .collect();
        falling.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut contacts = Vec::new();
        for (id, _) in falling {
            let Some(body) = self.bodies.get(&id).copied() else {
                continue;
            };
            let vy = GRAVITY.mul_add(dt, body.velocity.y);
            let y = vy.mul_add(dt, body.position.y);
            if y >= self.rest_y(body.lane, body.radius) {
                self.land(id, &mut contacts);
            } else if let Some(body) = self.bodies.get_mut(&id) {
                body.velocity.y = vy;
                body.position.y = y;
            }
        }
        contacts
    }

    fn clear(&mut self) {
        self.bodies.clear();
        for stack in &mut self.lanes {
            stack.clear();
        }
    }
}

fn lane_count(width: f32) -> usize {
    let lanes = (width / LANE_WIDTH).floor();
    if !lanes.is_finite() || lanes < 1.0 {
        return 1;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lanes = lanes as usize;
    lanes
}

fn count_as_f32(count: usize) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let count = count.max(1) as f32;
    count
}
