//! Headless engine binary for the Seedfall merge game.
//!
//! Plays one autoplay game against the configured ledger and logs the
//! outcome. Useful for exercising a ledger gateway end to end and for
//! watching the claim protocol under real latency.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `seedfall-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect the ledger backend
//! 4. Load the autoplay policy
//! 5. Run the session until game over, harvest, or the tick limit
//! 6. Log the result and the player's ledger balance

mod autoplay;
mod error;
mod lanes;
mod log_observer;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use seedfall_core::clock::SystemClock;
use seedfall_core::config::{GameConfig, LedgerConfig, LedgerKind};
use seedfall_core::runner::{self, RunBounds};
use seedfall_core::session::SessionController;
use seedfall_ledger::{HttpLedger, InMemoryLedger, LedgerBackend};
use seedfall_types::PlayerId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::autoplay::{AutoPlayer, AutoplayConfig};
use crate::error::EngineError;
use crate::lanes::LanePhysics;
use crate::log_observer::LogObserver;

const CONFIG_PATH: &str = "seedfall-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration, the ledger client, or the session
/// run fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging is configured from it.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    let default_level = config.logging.level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();

    info!(
        from_file,
        ledger = ?config.ledger.backend,
        max_spawn_rank = config.rules.max_spawn_rank,
        tick_interval_ms = config.engine.tick_interval_ms,
        max_ticks = config.engine.max_ticks,
        "seedfall-engine starting"
    );

    // 3. Connect the ledger.
    let ledger = connect_ledger(&config.ledger)?;
    info!(backend = ledger.name(), "Ledger backend ready");

    // 4. Autoplay policy and physics stand-in.
    let autoplay = load_autoplay_config()?;
    info!(
        drop_every_ticks = autoplay.drop_every_ticks,
        claim_threshold = autoplay.claim_threshold,
        "Autoplay configuration loaded"
    );
    let mut policy = AutoPlayer::new(autoplay, config.board.width);
    let mut physics = LanePhysics::new(&config.board);
    let mut observer = LogObserver::new();

    // 5. Run the session.
    let player = PlayerId::new();
    let mut controller =
        SessionController::new(&config, ledger, Arc::new(SystemClock::new()), player);
    let result = runner::run_session(
        &mut controller,
        &mut physics,
        &mut policy,
        &mut observer,
        RunBounds::from_config(&config.engine),
    )
    .await?;

    // 6. Log results.
    runner::log_run_end(&result);
    match controller.ledger().balance_of(player).await {
        Ok(balance) => info!(%player, balance, "Player balance"),
        Err(error) => warn!(%player, %error, "Balance query failed"),
    }

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "seedfall-engine shutdown complete"
    );

    Ok(())
}

/// Load the game configuration from `seedfall-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
/// Returns the configuration and whether the file was found.
fn load_config() -> Result<(GameConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((GameConfig::from_file(config_path)?, true))
    } else {
        Ok((GameConfig::parse("")?, false))
    }
}

/// Load autoplay settings from the `autoplay` section of the config file.
///
/// Missing file or missing section means defaults.
fn load_autoplay_config() -> Result<AutoplayConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if !config_path.exists() {
        return Ok(AutoplayConfig::default());
    }
    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Autoplay {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "autoplay" section.
    let raw: serde_yml::Value =
        serde_yml::from_str(&contents).map_err(|e| EngineError::Autoplay {
            message: format!("failed to parse config YAML: {e}"),
        })?;

    match raw.get("autoplay") {
        Some(section) => serde_yml::from_value(section.clone()).map_err(|e| EngineError::Autoplay {
            message: format!("failed to parse autoplay config: {e}"),
        }),
        None => Ok(AutoplayConfig::default()),
    }
}

/// Build the ledger backend selected in configuration.
fn connect_ledger(config: &LedgerConfig) -> Result<LedgerBackend, EngineError> {
    let backend = match config.backend {
        LedgerKind::Memory => {
            InMemoryLedger::with_latency(Duration::from_millis(config.latency_ms)).into()
        }
        LedgerKind::Http => {
            info!(url = config.url, timeout_ms = config.request_timeout_ms, "Using HTTP ledger");
            HttpLedger::new(&config.url, Duration::from_millis(config.request_timeout_ms))?.into()
        }
    };
    Ok(backend)
}
