//! Backend selection for the ledger client.
//!
//! Uses enum dispatch instead of trait objects because async methods are
//! not dyn-compatible, and the session runner needs `Send` futures it can
//! hand to `tokio::spawn`.

use seedfall_types::PlayerId;

use crate::LedgerError;
use crate::http::HttpLedger;
use crate::memory::InMemoryLedger;
use crate::protocol::{LedgerRequest, LedgerResponse};

/// A ledger the game can talk to.
#[derive(Debug, Clone)]
pub enum LedgerBackend {
    /// In-process contract model.
    InMemory(InMemoryLedger),
    /// Contract reached through an HTTP JSON-RPC gateway.
    Http(HttpLedger),
}

impl LedgerBackend {
    /// Execute a contract call on the selected backend.
    ///
    /// # Errors
    ///
    /// Returns the backend's [`LedgerError`].
    pub async fn execute(&self, request: &LedgerRequest) -> Result<LedgerResponse, LedgerError> {
        match self {
            Self::InMemory(ledger) => ledger.execute(request).await,
            Self::Http(ledger) => ledger.execute(request).await,
        }
    }

    /// Seeds credited to `player` so far.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Query`] if the backend cannot answer.
    pub async fn balance_of(&self, player: PlayerId) -> Result<u64, LedgerError> {
        match self {
            Self::InMemory(ledger) => Ok(ledger.balance_of(player).await),
            Self::Http(ledger) => ledger.balance_of(player).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InMemory(_) => "in-memory",
            Self::Http(_) => "http",
        }
    }
}

impl From<InMemoryLedger> for LedgerBackend {
    fn from(ledger: InMemoryLedger) -> Self {
        Self::InMemory(ledger)
    }
}

impl From<HttpLedger> for LedgerBackend {
    fn from(ledger: HttpLedger) -> Self {
        Self::Http(ledger)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatches_to_in_memory() {
        let memory = InMemoryLedger::new();
        let backend = LedgerBackend::from(memory.clone());
        assert_eq!(backend.name(), "in-memory");

        let player = PlayerId::new();
        let response = backend
            .execute(&LedgerRequest::StartGame { player })
            .await
            .unwrap();
        assert!(matches!(response, LedgerResponse::GameStarted { .. }));
        assert_eq!(backend.balance_of(player).await.unwrap(), 0);
        assert_eq!(memory.call_log().await.len(), 1);
    }
}
