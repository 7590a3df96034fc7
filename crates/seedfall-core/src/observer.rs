//! Outer callback surface for renderers, UIs and loggers.

use seedfall_types::{EntityDelta, HarvestReceipt, SessionSnapshot};

/// Receives session updates from the runner.
///
/// Every callback is advisory. The registry and the snapshot remain the
/// state of record, so an observer that misses a delta can resynchronise
/// from the next snapshot.
pub trait SessionObserver: Send {
    /// Discs entered or left play.
    fn on_entities_changed(&mut self, delta: &EntityDelta);

    /// The session snapshot differs from the last one delivered.
    fn on_snapshot_changed(&mut self, snapshot: &SessionSnapshot);

    /// A harvest credited seeds to the player.
    fn on_seeds_harvested(&mut self, receipt: &HarvestReceipt);
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl SessionObserver for NoOpObserver {
    fn on_entities_changed(&mut self, _delta: &EntityDelta) {}

    fn on_snapshot_changed(&mut self, _snapshot: &SessionSnapshot) {}

    fn on_seeds_harvested(&mut self, _receipt: &HarvestReceipt) {}
}
