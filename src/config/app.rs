//! Application configuration loading from config.toml
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Only a file that exists but cannot be parsed is an error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Flush intervals for the settings reconciliation loops
    pub reconcile: ReconcileConfig,
    /// Reaction-role behaviour
    pub reaction_roles: ReactionRoleConfig,
}

/// Per-module flush intervals, in seconds
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Command prefix settings
    pub prefix_interval_secs: u64,
    /// Content filter toggles
    pub filter_interval_secs: u64,
    /// Measurement unit preferences
    pub units_interval_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            prefix_interval_secs: 30,
            filter_interval_secs: 60,
            units_interval_secs: 60,
        }
    }
}

impl ReconcileConfig {
    /// Interval for the prefix loop.
    #[must_use]
    pub fn prefix_interval(&self) -> Duration {
        clamp_interval(self.prefix_interval_secs)
    }

    /// Interval for the content filter loop.
    #[must_use]
    pub fn filter_interval(&self) -> Duration {
        clamp_interval(self.filter_interval_secs)
    }

    /// Interval for the unit preference loop.
    #[must_use]
    pub fn units_interval(&self) -> Duration {
        clamp_interval(self.units_interval_secs)
    }
}

// Intervals are kept inside 5..=600 seconds.
fn clamp_interval(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(5, 600))
}

/// Most emoji/role pairs a single legend may carry.
pub const MAX_PAIRS_LIMIT: usize = 10;

/// Reaction-role settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ReactionRoleConfig {
    /// Delay before a reaction event is processed, in milliseconds
    pub settle_delay_ms: u64,
    /// Maximum emoji/role pairs on one message, kept inside 1..=10
    pub max_pairs: usize,
}

impl Default for ReactionRoleConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 500,
            max_pairs: MAX_PAIRS_LIMIT,
        }
    }
}

impl ReactionRoleConfig {
    /// Settle delay as a [`Duration`].
    #[must_use]
    pub const fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Pair limit for new legends.
    #[must_use]
    pub fn max_pairs(&self) -> usize {
        self.max_pairs.clamp(1, MAX_PAIRS_LIMIT)
    }
}

/// Loads configuration from a TOML file, returning defaults when the file does not exist.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No config file at {path_ref:?}, using defaults");
        return Ok(AppConfig::default());
    }

    debug!("Loading configuration from {path_ref:?}");
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {path_ref:?}: {e}"),
    })
}

/// Loads configuration from `GUILD_BUDDY_CONFIG`, or ./config.toml when unset.
pub fn load_default_config() -> Result<AppConfig> {
    let path = std::env::var("GUILD_BUDDY_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r"
            [reconcile]
            prefix_interval_secs = 10

            [reaction_roles]
            settle_delay_ms = 250
        ";

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.reconcile.prefix_interval(), Duration::from_secs(10));
        assert_eq!(config.reconcile.filter_interval(), Duration::from_secs(60));
        assert_eq!(
            config.reaction_roles.settle_delay(),
            Duration::from_millis(250)
        );
        assert_eq!(config.reaction_roles.max_pairs(), 10);
    }

    #[test]
    fn test_max_pairs_is_clamped() {
        let config: AppConfig = toml::from_str("[reaction_roles]\nmax_pairs = 50").unwrap();
        assert_eq!(config.reaction_roles.max_pairs(), MAX_PAIRS_LIMIT);

        let config: AppConfig = toml::from_str("[reaction_roles]\nmax_pairs = 0").unwrap();
        assert_eq!(config.reaction_roles.max_pairs(), 1);

        let config: AppConfig = toml::from_str("[reaction_roles]\nmax_pairs = 4").unwrap();
        assert_eq!(config.reaction_roles.max_pairs(), 4);
    }

    #[test]
    fn test_intervals_are_clamped() {
        let config = ReconcileConfig {
            prefix_interval_secs: 0,
            filter_interval_secs: 10_000,
            units_interval_secs: 45,
        };
        assert_eq!(config.prefix_interval(), Duration::from_secs(5));
        assert_eq!(config.filter_interval(), Duration::from_secs(600));
        assert_eq!(config.units_interval(), Duration::from_secs(45));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("definitely/not/here/config.toml").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let path = std::env::temp_dir().join("guild_buddy_invalid_config.toml");
        std::fs::write(&path, "reconcile = 12").unwrap();
        let result = load_config(&path);
        assert!(matches!(result, Err(Error::Config { .. })));
        std::fs::remove_file(&path).unwrap();
    }
}
