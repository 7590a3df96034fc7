//! Configuration loading and typed config structures for Seedfall.
//!
//! The canonical configuration lives in `seedfall-config.yaml` next to the
//! binary. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads the file. Every field has a
//! default, so an empty or partial file is valid.

use std::path::Path;

use serde::Deserialize;

/// Environment variable overriding `ledger.url`.
pub const LEDGER_URL_ENV: &str = "SEEDFALL_LEDGER_URL";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GameConfig {
    /// Container geometry.
    #[serde(default)]
    pub board: BoardConfig,

    /// Game rules and thresholds.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Remote ledger connection.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Headless runner timing.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `SEEDFALL_LEDGER_URL` overrides `ledger.url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.ledger.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.rules.max_spawn_rank) {
            return Err(ConfigError::Invalid {
                field: "rules.max_spawn_rank",
                reason: format!("{} is outside 1..=10", self.rules.max_spawn_rank),
            });
        }
        if self.rules.claim_drops == 0 {
            return Err(ConfigError::Invalid {
                field: "rules.claim_drops",
                reason: "a claim needs at least one drop".to_owned(),
            });
        }
        if self.board.width <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "board.width",
                reason: format!("{} is not positive", self.board.width),
            });
        }
        if self.board.danger_zone_y >= self.board.floor_y {
            return Err(ConfigError::Invalid {
                field: "board.danger_zone_y",
                reason: "danger line must sit above the floor".to_owned(),
            });
        }
        Ok(())
    }
}

/// Container geometry, in container units with `y` growing downward.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoardConfig {
    /// Inner width of the container.
    #[serde(default = "default_board_width")]
    pub width: f32,

    /// Height at which dropped fruits appear.
    #[serde(default = "default_drop_y")]
    pub drop_y: f32,

    /// Fruits resting above this line (smaller `y`) end the game.
    #[serde(default = "default_danger_zone_y")]
    pub danger_zone_y: f32,

    /// Container floor.
    #[serde(default = "default_floor_y")]
    pub floor_y: f32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            width: default_board_width(),
            drop_y: default_drop_y(),
            danger_zone_y: default_danger_zone_y(),
            floor_y: default_floor_y(),
        }
    }
}

/// Game rules.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RulesConfig {
    /// How long a fruit must have existed before it can end the game.
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,

    /// Speed below which a fruit counts as resting, per axis.
    #[serde(default = "default_settle_velocity")]
    pub settle_velocity: f32,

    /// Highest rank a dropped fruit can have.
    #[serde(default = "default_max_spawn_rank")]
    pub max_spawn_rank: u8,

    /// Minimum time between two drops.
    #[serde(default = "default_drop_cooldown_ms")]
    pub drop_cooldown_ms: u64,

    /// Length of the claim countdown mirrored from the contract.
    #[serde(default = "default_claim_drops")]
    pub claim_drops: u8,

    /// Allow a practice claim countdown in offline games.
    #[serde(default)]
    pub offline_claims: bool,

    /// Seed for the next-fruit RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
            settle_velocity: default_settle_velocity(),
            max_spawn_rank: default_max_spawn_rank(),
            drop_cooldown_ms: default_drop_cooldown_ms(),
            claim_drops: default_claim_drops(),
            offline_claims: false,
            seed: default_seed(),
        }
    }
}

/// Which ledger implementation to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// In-process contract model.
    #[default]
    Memory,
    /// HTTP JSON-RPC gateway.
    Http,
}

/// Remote ledger connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: LedgerKind,

    /// Gateway base URL, used by the HTTP backend.
    #[serde(default = "default_ledger_url")]
    pub url: String,

    /// Per-request deadline for the HTTP backend.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Artificial latency for the in-memory backend.
    #[serde(default)]
    pub latency_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerKind::default(),
            url: default_ledger_url(),
            request_timeout_ms: default_request_timeout_ms(),
            latency_ms: 0,
        }
    }
}

impl LedgerConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(LEDGER_URL_ENV) {
            self.url = url;
        }
    }
}

/// Headless runner timing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Real-time milliseconds per simulation tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_ticks: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

const fn default_board_width() -> f32 {
    400.0
}

const fn default_drop_y() -> f32 {
    40.0
}

const fn default_danger_zone_y() -> f32 {
    80.0
}

const fn default_floor_y() -> f32 {
    600.0
}

const fn default_dwell_ms() -> u64 {
    2_000
}

const fn default_settle_velocity() -> f32 {
    1.0
}

const fn default_max_spawn_rank() -> u8 {
    5
}

const fn default_drop_cooldown_ms() -> u64 {
    500
}

const fn default_claim_drops() -> u8 {
    5
}

const fn default_seed() -> u64 {
    42
}

fn default_ledger_url() -> String {
    "http://localhost:8545".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    7_000
}

const fn default_tick_interval_ms() -> u64 {
    16
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.rules.dwell_ms, 2_000);
        assert_eq!(config.rules.claim_drops, 5);
        assert_eq!(config.rules.max_spawn_rank, 5);
        assert_eq!(config.ledger.backend, LedgerKind::Memory);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
board:
  width: 320
  drop_y: 30
  danger_zone_y: 70
  floor_y: 480

rules:
  dwell_ms: 1500
  settle_velocity: 0.5
  max_spawn_rank: 3
  drop_cooldown_ms: 250
  claim_drops: 5
  offline_claims: true
  seed: 7

ledger:
  backend: http
  url: "http://ledger.test:9000"
  request_timeout_ms: 3000

engine:
  tick_interval_ms: 10
  max_ticks: 5000

logging:
  level: "debug"
"#;

        let config = GameConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert!((config.board.width - 320.0).abs() < f32::EPSILON);
        assert_eq!(config.rules.dwell_ms, 1500);
        assert_eq!(config.rules.max_spawn_rank, 3);
        assert!(config.rules.offline_claims);
        assert_eq!(config.ledger.backend, LedgerKind::Http);
        assert_eq!(config.ledger.request_timeout_ms, 3000);
        assert_eq!(config.engine.max_ticks, 5000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = GameConfig::parse("rules:\n  seed: 9\n");
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();
        assert_eq!(config.rules.seed, 9);
        assert_eq!(config.rules.drop_cooldown_ms, 500);
        assert_eq!(config.engine.tick_interval_ms, 16);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(GameConfig::parse("").is_ok());
    }

    #[test]
    fn rejects_out_of_range_spawn_rank() {
        let result = GameConfig::parse("rules:\n  max_spawn_rank: 11\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "rules.max_spawn_rank",
                ..
            })
        ));
    }

    #[test]
    fn rejects_danger_line_below_floor() {
        let result = GameConfig::parse("board:\n  danger_zone_y: 700\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
