//! Error types for the Seedfall engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the session run.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: seedfall_core::config::ConfigError,
    },

    /// The ledger client could not be built.
    #[error("ledger error: {source}")]
    Ledger {
        /// The underlying ledger error.
        #[from]
        source: seedfall_ledger::LedgerError,
    },

    /// Session runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: seedfall_core::runner::RunnerError,
    },

    /// The `autoplay` config section could not be read.
    #[error("autoplay config error: {message}")]
    Autoplay {
        /// Description of the failure.
        message: String,
    },
}
