//! Session observer that reports to `tracing`.

use tracing::{debug, info};

use seedfall_core::observer::SessionObserver;
use seedfall_types::{ClaimState, EntityDelta, HarvestReceipt, SessionSnapshot};

/// Logs entity churn at `debug` and protocol changes at `info`.
#[derive(Debug, Default)]
pub struct LogObserver {
    claim_state: ClaimState,
    online: bool,
    game_over: bool,
}

impl LogObserver {
    /// Create an observer expecting an idle, offline session.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionObserver for LogObserver {
    fn on_entities_changed(&mut self, delta: &EntityDelta) {
        debug!(
            removed = delta.removed.len(),
            spawned = delta.spawned.len(),
            "entities changed"
        );
    }

    fn on_snapshot_changed(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.is_online() != self.online {
            self.online = snapshot.is_online();
            info!(session = ?snapshot.remote_session, "ledger session changed");
        }
        if snapshot.claim_state != self.claim_state {
            info!(
                from = %self.claim_state,
                to = %snapshot.claim_state,
                drops_remaining = snapshot.drops_remaining,
                pending_yield = snapshot.pending_yield,
                "claim state changed"
            );
            self.claim_state = snapshot.claim_state;
        }
        if snapshot.is_game_over && !self.game_over {
            info!(
                score = snapshot.score,
                highest_rank = snapshot.highest_rank.get(),
                pending_yield = snapshot.pending_yield,
                "board filled"
            );
        }
        self.game_over = snapshot.is_game_over;
        debug!(
            score = snapshot.score,
            pending_yield = snapshot.pending_yield,
            entities = snapshot.entity_count,
            next_rank = snapshot.next_rank.get(),
            "snapshot"
        );
    }

    fn on_seeds_harvested(&mut self, receipt: &HarvestReceipt) {
        info!(
            session = %receipt.session,
            seeds = receipt.seeds,
            balance = receipt.balance,
            "seeds credited"
        );
    }
}
