//! Configuration management for jobsift
//!
//! The engine owns one `Config` at a time. It is loaded from a TOML file
//! (or defaults), overlaid with the persisted user settings, and replaced
//! wholesale whenever a settings update arrives.

use crate::error::{Result, SiftError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod settings;
mod validator;

pub use settings::{SettingsFile, SettingsUpdate, StoredSettings};
pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_true")]
    pub filtering_enabled: bool,
    pub selectors: SelectorConfig,
    pub thresholds: Thresholds,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub auto_refresh: AutoRefreshConfig,
    pub navigation: NavigationConfig,
}

fn default_true() -> bool {
    true
}

/// CSS selectors locating the list container and the two per-item fragments
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorConfig {
    pub job_tile_list: String,
    pub client_spending: String,
    pub proposals: String,
}

/// Numeric thresholds an item must satisfy to stay visible
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    pub minimum_spent: f64,
    pub proposals_min: u32,
    pub proposals_max: u32,
}

impl Thresholds {
    /// Lower bound of the fully open proposals range
    pub const OPEN_PROPOSALS_MIN: u32 = 0;
    /// Upper bound of the fully open proposals range
    pub const OPEN_PROPOSALS_MAX: u32 = 100;

    /// True when the proposals range is the default [0, 100], which
    /// disables proposal filtering entirely.
    pub fn is_open_proposals_range(&self) -> bool {
        self.proposals_min == Self::OPEN_PROPOSALS_MIN
            && self.proposals_max == Self::OPEN_PROPOSALS_MAX
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            minimum_spent: 1.0,
            proposals_min: Self::OPEN_PROPOSALS_MIN,
            proposals_max: Self::OPEN_PROPOSALS_MAX,
        }
    }
}

/// Logging configuration used by the binary's subscriber
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: String, // "debug", "info", "warn" or "error"
}

/// Debounce and pass-duration budget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceConfig {
    pub debounce_delay_ms: u64,
    pub max_processing_time_ms: u64,
}

/// Periodic full-page reload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoRefreshConfig {
    pub enabled: bool,
    pub refresh_interval_ms: u64,
}

/// Route-change detection tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavigationConfig {
    /// Path fragment identifying job-listing pages
    pub listing_path: String,
    pub notify_delay_ms: u64,
    pub link_check_delay_ms: u64,
    pub insert_check_delay_ms: u64,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SiftError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Overlay the persisted user settings onto this configuration
    pub fn apply_stored_settings(&mut self, stored: &StoredSettings) {
        self.thresholds = Thresholds {
            minimum_spent: stored.minimum_spent,
            proposals_min: stored.proposals_min,
            proposals_max: stored.proposals_max,
        };
        self.filtering_enabled = stored.filtering_enabled;
        self.auto_refresh.enabled = stored.auto_refresh_enabled;
        self.auto_refresh.refresh_interval_ms = stored.auto_refresh_interval_ms;
    }

    /// Build the configuration that results from an inbound settings update.
    /// Optional fields left out of the update keep their current values.
    pub fn with_update(&self, update: &SettingsUpdate) -> Config {
        let mut next = self.clone();
        next.thresholds = Thresholds {
            minimum_spent: update.minimum_spent,
            proposals_min: update.proposals_min,
            proposals_max: update.proposals_max,
        };
        if let Some(enabled) = update.filtering_enabled {
            next.filtering_enabled = enabled;
        }
        if let Some(enabled) = update.auto_refresh_enabled {
            next.auto_refresh.enabled = enabled;
        }
        if let Some(interval) = update.auto_refresh_interval_ms {
            next.auto_refresh.refresh_interval_ms = interval;
        }
        next
    }

    /// Apply environment variable overrides
    /// Environment variables in format: JOBSIFT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("JOBSIFT_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "FILTERING_ENABLED" => {
                self.filtering_enabled = parse_env(path, value)?;
            }
            "LOGGING__LEVEL" => {
                self.logging.level = value.to_string();
            }
            "PERFORMANCE__DEBOUNCE_DELAY_MS" => {
                self.performance.debounce_delay_ms = parse_env(path, value)?;
            }
            "AUTO_REFRESH__ENABLED" => {
                self.auto_refresh.enabled = parse_env(path, value)?;
            }
            "AUTO_REFRESH__REFRESH_INTERVAL_MS" => {
                self.auto_refresh.refresh_interval_ms = parse_env(path, value)?;
            }
            "NAVIGATION__LISTING_PATH" => {
                self.navigation.listing_path = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SiftError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("jobsift").join("config.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| SiftError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filtering_enabled: true,
            selectors: SelectorConfig {
                job_tile_list: r#"div[data-test="job-tile-list"]"#.to_string(),
                client_spending: r#"small[data-test="client-spendings"]"#.to_string(),
                proposals: r#"strong[data-test="proposals"]"#.to_string(),
            },
            thresholds: Thresholds::default(),
            logging: LoggingConfig {
                enabled: true,
                level: "info".to_string(),
            },
            performance: PerformanceConfig {
                debounce_delay_ms: 300,
                max_processing_time_ms: 5000,
            },
            auto_refresh: AutoRefreshConfig {
                enabled: true,
                refresh_interval_ms: 60_000,
            },
            navigation: NavigationConfig {
                listing_path: "/nx/find-work/".to_string(),
                notify_delay_ms: 100,
                link_check_delay_ms: 200,
                insert_check_delay_ms: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.performance.debounce_delay_ms = 450;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.performance.debounce_delay_ms, 450);
        assert_eq!(loaded.selectors, config.selectors);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load(&temp_dir.path().join("absent.toml"));
        assert!(matches!(result, Err(SiftError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_update_keeps_unspecified_flags() {
        let config = Config::default();
        let update = SettingsUpdate {
            minimum_spent: 500.0,
            proposals_min: 5,
            proposals_max: 20,
            filtering_enabled: None,
            auto_refresh_enabled: Some(false),
            auto_refresh_interval_ms: None,
        };

        let next = config.with_update(&update);
        assert_eq!(next.thresholds.minimum_spent, 500.0);
        assert_eq!(next.thresholds.proposals_max, 20);
        assert!(next.filtering_enabled);
        assert!(!next.auto_refresh.enabled);
        assert_eq!(next.auto_refresh.refresh_interval_ms, 60_000);
    }

    #[test]
    fn test_open_proposals_range() {
        assert!(Thresholds::default().is_open_proposals_range());
        let narrowed = Thresholds {
            proposals_max: 99,
            ..Thresholds::default()
        };
        assert!(!narrowed.is_open_proposals_range());
    }
}
