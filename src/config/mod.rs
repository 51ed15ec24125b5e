//! # Configuration Management Module
//!
//! This module handles all configuration aspects of the rubybot client,
//! providing a centralized configuration system with validation, defaults,
//! and persistence.
//!
//! ## Features
//!
//! - **Structured Configuration**: Type-safe configuration with serde serialization
//! - **Validation**: Load-time validation of thresholds, paths, and the session token
//! - **Defaults**: Sensible default values for all configuration options
//!
//! ## Configuration Structure
//!
//! The configuration is organized into logical sections:
//!
//! - [`ApiConfig`] - Game server endpoint, session token, throttle and retry policy
//! - [`RouteConfig`] - Farming route selection and persistence settings
//! - [`CombatConfig`] - Combat thresholds and the low-damage heuristic
//! - [`RecoveryConfig`] - City excursion geography and resupply targets
//! - [`DataConfig`] - World map and mob database file locations
//! - [`LoggingConfig`] - Application log and raw API dump settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rubybot::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration from file
//!     let config = Config::load("config.toml").await?;
//!
//!     println!("Server: {}", config.api.base_url);
//!     println!("Kills per square: {}", config.route.kills_per_square);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! Rubybot uses TOML format for human-readable configuration:
//!
//! ```toml
//! [api]
//! base_url = "https://ruby-king.ru/api"
//! token = "your-session-token"
//!
//! [route]
//! kills_per_square = 10
//!
//! [combat]
//! heal_threshold_pct = 85.0
//! mana_threshold_pct = 50.0
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub combat: CombatConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Game server connection settings and request pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the game API, without a trailing slash.
    pub base_url: String,
    /// Session token, sent as the `name` query parameter on every request.
    pub token: String,
    /// Minimum gap between two consecutive outbound requests (ms). Must be >= 1000.
    #[serde(default = "default_min_request_gap_ms")]
    pub min_request_gap_ms: u64,
    /// Retry budget for a single request before the transport gives up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base retry delay in seconds; doubled on each attempt.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_min_request_gap_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    30
}

/// Farming route construction and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Kills on a square before the route advances to the next point.
    pub kills_per_square: u32,
    /// Width of the level band below the player accepted as in-band squares.
    pub level_band: u32,
    /// Squares above this mob level never enter the route.
    pub max_mob_level: i64,
    /// File holding the persisted route position (a single decimal integer).
    pub index_file: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            kills_per_square: 10,
            level_band: 9,
            max_mob_level: 20,
            index_file: "data/route-index.txt".to_string(),
        }
    }
}

/// Combat decision thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Heal potion is used below this HP percentage.
    pub heal_threshold_pct: f64,
    /// Mana potion is used below this MP percentage.
    pub mana_threshold_pct: f64,
    /// Skill is used only while the target has strictly more HP than this.
    pub skill_hp_threshold: i64,
    /// Skill id sent with skill attacks.
    pub skill_id: String,
    /// A hit at or below `session average * ratio` counts toward the weak-hit streak.
    pub low_damage_ratio: f64,
    /// Consecutive weak hits required to trigger a recovery excursion.
    pub low_damage_window: usize,
    /// Potion stock at or below this count triggers a recovery excursion.
    pub min_potion_stock: i64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            heal_threshold_pct: 85.0,
            mana_threshold_pct: 50.0,
            skill_hp_threshold: 100,
            skill_id: "sk_1".to_string(),
            low_damage_ratio: 0.5,
            low_damage_window: 3,
            min_potion_stock: 10,
        }
    }
}

/// Geography and resupply targets for the city excursion.
///
/// The square and location ids are server data and cannot be derived from
/// the world map alone; the defaults match the live world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Known-safe square to stand on before leaving the farm zone.
    pub safe_square: String,
    /// Farm location for players below `advanced_from_level`.
    pub beginner_location: String,
    /// Farm location for players at or above `advanced_from_level`.
    pub advanced_location: String,
    /// Level at which the route switches to the advanced location.
    pub advanced_from_level: u32,
    /// Direction entered when returning to the farm zone.
    pub default_direction: String,
    /// Each potion type is restocked up to this count.
    pub potion_target: i64,
    /// Pause between excursion steps (seconds).
    pub step_pause_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            safe_square: "s_1_1".to_string(),
            beginner_location: "loco_0".to_string(),
            advanced_location: "loco_1".to_string(),
            advanced_from_level: 10,
            default_direction: "E".to_string(),
            potion_target: 300,
            step_pause_secs: 2,
        }
    }
}

/// Locations of the static world map and the mob observation database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// World map JSON document (read-only input).
    pub world_map: String,
    /// Mob observation database (merged and rewritten as mobs are seen).
    pub mob_db: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            world_map: "data/world_map.json".to_string(),
            mob_db: "data/mobs.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Application log file; console output is mirrored here when stdout is a TTY.
    pub file: Option<String>,
    /// Append-mode dump of every raw API response body.
    #[serde(default)]
    pub api_dump_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("rubybot.log".to_string()),
            api_dump_file: Some("rubybot-api.log".to_string()),
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file.
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Validate configuration values before the engine starts.
    pub fn validate(&self) -> Result<()> {
        if self.api.token.trim().is_empty() {
            return Err(anyhow!("api.token is empty; set your session token"));
        }
        if self.api.base_url.trim().is_empty() {
            return Err(anyhow!("api.base_url is empty"));
        }
        if self.api.min_request_gap_ms < 1000 {
            return Err(anyhow!(
                "api.min_request_gap_ms must be >= 1000 (got {})",
                self.api.min_request_gap_ms
            ));
        }
        if self.route.kills_per_square == 0 {
            return Err(anyhow!("route.kills_per_square must be >= 1"));
        }
        if !(self.combat.low_damage_ratio > 0.0 && self.combat.low_damage_ratio <= 1.0) {
            return Err(anyhow!(
                "combat.low_damage_ratio must be in (0, 1] (got {})",
                self.combat.low_damage_ratio
            ));
        }
        if self.combat.low_damage_window == 0 {
            return Err(anyhow!("combat.low_damage_window must be >= 1"));
        }
        if self.combat.heal_threshold_pct <= 0.0 || self.combat.mana_threshold_pct <= 0.0 {
            return Err(anyhow!("combat thresholds must be positive"));
        }
        if self.recovery.potion_target <= 0 {
            return Err(anyhow!("recovery.potion_target must be positive"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "https://ruby-king.ru/api".to_string(),
                token: String::new(),
                min_request_gap_ms: default_min_request_gap_ms(),
                max_retries: default_max_retries(),
                retry_delay_secs: default_retry_delay_secs(),
                timeout_secs: default_timeout_secs(),
            },
            route: RouteConfig::default(),
            combat: CombatConfig::default(),
            recovery: RecoveryConfig::default(),
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
