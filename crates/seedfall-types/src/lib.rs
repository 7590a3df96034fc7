//! Shared type definitions for the Seedfall merge game.
//!
//! This crate is the single source of truth for types crossing crate
//! boundaries: the game core, the ledger layer, and the UI. Types flow
//! downstream to `TypeScript` via `ts-rs` so the browser front end renders
//! the same snapshots and deltas the core produces.
//!
//! # Modules
//!
//! - [`ids`] -- Player, entity and remote session identifiers
//! - [`rank`] -- The validated [`Rank`] newtype
//! - [`enums`] -- Claim state and ledger operation enums
//! - [`structs`] -- Geometry, entities, deltas, snapshots, receipts

pub mod enums;
pub mod ids;
pub mod rank;
pub mod structs;

pub use enums::{ClaimState, LedgerOp};
pub use ids::{EntityId, PlayerId, RemoteSessionId};
pub use rank::{Rank, RankError};
pub use structs::{
    BodyState, Collision, Entity, EntityDelta, HarvestReceipt, Point, SessionSnapshot,
    SpawnedEntity,
};

#[cfg(test)]
mod tests {
    //! Binding generation for the UI layer.

    #[test]
    fn export_bindings() {
        // Types with #[ts(export)] write their `.ts` files into `bindings/`
        // relative to the crate root when exported.
        use ts_rs::TS;

        let _ = crate::ids::PlayerId::export_all();
        let _ = crate::ids::EntityId::export_all();
        let _ = crate::ids::RemoteSessionId::export_all();
        let _ = crate::rank::Rank::export_all();
        let _ = crate::enums::ClaimState::export_all();
        let _ = crate::enums::LedgerOp::export_all();
        let _ = crate::structs::Point::export_all();
        let _ = crate::structs::BodyState::export_all();
        let _ = crate::structs::Collision::export_all();
        let _ = crate::structs::Entity::export_all();
        let _ = crate::structs::SpawnedEntity::export_all();
        let _ = crate::structs::EntityDelta::export_all();
        let _ = crate::structs::SessionSnapshot::export_all();
        let _ = crate::structs::HarvestReceipt::export_all();
    }
}
