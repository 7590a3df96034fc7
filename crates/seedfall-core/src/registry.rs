//! Entity registry: the owner of every disc in play.
//!
//! The registry is an arena of slots addressed by [`EntityId`]. Freed slots
//! go onto a free list and are reused by later inserts, with the slot's
//! generation bumped so handles to the removed disc stop resolving. Insert,
//! remove and lookup are all O(1).
//!
//! The merge engine and game-over detector never keep their own copy of
//! the entity set; they read through [`EntityRegistry::get`] and
//! [`EntityRegistry::iter`] and mutate only through
//! [`EntityRegistry::insert`] and [`EntityRegistry::remove`].

use seedfall_types::{Entity, EntityId, Rank};

#[derive(Debug, Clone)]
enum Slot {
    Occupied(Entity),
    Vacant {
        generation: u32,
        next_free: Option<u32>,
    },
}

/// Arena of live discs.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    slots: Vec<Slot>,
    free_head: Option<u32>,
    len: usize,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of live discs.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no disc is in play.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Add a disc and return its handle.
    pub fn insert(&mut self, rank: Rank, spawned_at_ms: u64) -> EntityId {
        let id = self.pop_free().unwrap_or_else(|| {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot::Vacant {
                generation: 0,
                next_free: None,
            });
            EntityId::new(index, 0)
        });

        if let Some(slot) = self.slot_mut(id.index) {
            *slot = Slot::Occupied(Entity {
                id,
                rank,
                spawned_at_ms,
            });
            self.len = self.len.saturating_add(1);
        }
        id
    }

    /// Remove a disc, returning it if the handle was live.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let free_head = self.free_head;
        let slot = self.slot_mut(id.index)?;
        let entity = match slot {
            Slot::Occupied(entity) if entity.id == id => *entity,
            _ => return None,
        };
        *slot = Slot::Vacant {
            generation: id.generation.wrapping_add(1),
            next_free: free_head,
        };
        self.free_head = Some(id.index);
        self.len = self.len.saturating_sub(1);
        Some(entity)
    }

    /// Look up a live disc.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        match self.slots.get(usize::try_from(id.index).ok()?)? {
            Slot::Occupied(entity) if entity.id == id => Some(entity),
            _ => None,
        }
    }

    /// Whether the handle refers to a live disc.
    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Iterate over live discs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Occupied(entity) => Some(entity),
            Slot::Vacant { .. } => None,
        })
    }

    /// Copy of the live set as it is right now.
    ///
    /// Callers that need to remove discs while walking the set collect a
    /// snapshot (or the ids) first.
    pub fn snapshot(&self) -> Vec<Entity> {
        self.iter().copied().collect()
    }

    /// Remove every disc.
    ///
    /// Slots are kept and their generations bumped, so handles issued before
    /// the clear never resolve to discs inserted after it.
    pub fn clear(&mut self) {
        let mut free_head = None;
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            let generation = match slot {
                Slot::Occupied(entity) => entity.id.generation.wrapping_add(1),
                Slot::Vacant { generation, .. } => *generation,
            };
            *slot = Slot::Vacant {
                generation,
                next_free: free_head,
            };
            free_head = u32::try_from(index).ok();
        }
        self.free_head = free_head;
        self.len = 0;
    }

    fn pop_free(&mut self) -> Option<EntityId> {
        let index = self.free_head?;
        match self.slots.get(usize::try_from(index).ok()?)? {
            Slot::Vacant {
                generation,
                next_free,
            } => {
                let id = EntityId::new(index, *generation);
                self.free_head = *next_free;
                Some(id)
            }
            Slot::Occupied(_) => {
                // Free list points at a live slot; drop the list and grow.
                self.free_head = None;
                None
            }
        }
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut Slot> {
        self.slots.get_mut(usize::try_from(index).ok()?)
    }
}
