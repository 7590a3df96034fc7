//! Identifier types.
//!
//! Players are identified by UUID v7 wrappers generated through
//! [`define_id!`]. In-play discs use [`EntityId`], a generational arena
//! handle issued by the entity registry, and remote ledger sessions use the
//! numeric [`RemoteSessionId`] handed out by the contract.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identity of the player account that earns and redeems seeds.
    PlayerId
}

/// Handle to a live disc in the entity registry.
///
/// `index` addresses a slot in the registry arena; `generation` is bumped
/// every time the slot is freed, so a handle kept past its entity's removal
/// never resolves to whatever disc later occupies the same slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct EntityId {
    /// Slot index in the registry arena.
    pub index: u32,
    /// Slot generation at the time the entity was inserted.
    pub generation: u32,
}

impl EntityId {
    /// Build a handle from its raw parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Session identifier issued by the remote ledger's `start_game` call.
///
/// Its presence on a game means the game is mirrored on the ledger; its
/// absence means the game runs offline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct RemoteSessionId(pub u64);

impl RemoteSessionId {
    /// Return the raw numeric id.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for RemoteSessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}
