//! Forecast configuration with documented constants
//!
//! Everything tunable about a forecast run is collected here. Values are
//! threaded explicitly through `SimulationContext`; there is no global
//! config accessor.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{ForecastError, Result};
use crate::state::GameConfig;

/// Configuration for forecast runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    // === GATEWAY ===
    /// Base URL of the ledger state endpoint (HTTP gateway only)
    pub endpoint: String,

    /// Upper bound on a single gateway call, in milliseconds
    ///
    /// A fetch that exceeds this surfaces as `FetchTimeout` instead of
    /// suspending the batch forever.
    pub fetch_timeout_ms: u64,

    // === BATCH ===
    /// Trial count used when the caller does not pick one
    pub default_trial_count: u32,

    /// Minimum trial count before trials are spread across rayon workers
    ///
    /// Below this, thread overhead exceeds the gain and trials run in order.
    pub parallel_threshold: u32,

    // === RESOLVER ===
    /// Turn cap for a single fight; hitting it counts as a loss for the
    /// attacking side
    pub max_turns: u32,

    /// HP multiplier applied to both sides of an arena fight
    pub arena_hp_multiplier: i64,

    /// Constants used when the ledger has no game config state
    ///
    /// `None` makes an absent game config abort the batch.
    pub fallback_game_config: Option<GameConfig>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:31280".into(),
            fetch_timeout_ms: 10_000,

            default_trial_count: 100,
            parallel_threshold: 1_000,

            max_turns: 200,
            arena_hp_multiplier: 2,

            fallback_game_config: None,
        }
    }
}

impl ForecastConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout_ms == 0 {
            return Err(ForecastError::Config("fetch_timeout_ms must be positive".into()));
        }
        if self.default_trial_count == 0 {
            return Err(ForecastError::Config("default_trial_count must be positive".into()));
        }
        if self.max_turns == 0 {
            return Err(ForecastError::Config("max_turns must be positive".into()));
        }
        if self.arena_hp_multiplier <= 0 {
            return Err(ForecastError::Config(format!(
                "arena_hp_multiplier ({}) must be positive",
                self.arena_hp_multiplier
            )));
        }
        Ok(())
    }

    /// Load config from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse config from a TOML string; missing keys take their defaults
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: ForecastConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ForecastConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_trial_count_matches_ui_step() {
        assert_eq!(ForecastConfig::new().default_trial_count, 100);
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config = ForecastConfig::parse_toml(
            r#"
            endpoint = "http://ledger.example:8080"
            parallel_threshold = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "http://ledger.example:8080");
        assert_eq!(config.parallel_threshold, 50);
        assert_eq!(config.max_turns, 200);
        assert!(config.fallback_game_config.is_none());
    }

    #[test]
    fn test_parse_fallback_game_config() {
        let config = ForecastConfig::parse_toml(
            r#"
            [fallback_game_config]
            shatter_strike_max_damage = 400000
            "#,
        )
        .unwrap();
        let fallback = config.fallback_game_config.unwrap();
        assert_eq!(fallback.shatter_strike_max_damage, 400_000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = ForecastConfig::default();
        config.max_turns = 0;
        assert!(config.validate().is_err());

        let mut config = ForecastConfig::default();
        config.arena_hp_multiplier = 0;
        assert!(config.validate().is_err());

        assert!(ForecastConfig::parse_toml("fetch_timeout_ms = 0").is_err());
    }
}
