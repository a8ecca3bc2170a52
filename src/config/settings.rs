// Persisted user settings and the inbound settings-update payload

use crate::error::{Result, SiftError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Keys the external settings store persists, with their defaults.
/// Read-only to the engine; the editing surface owns range clamping.
///
/// Each key falls back to its default on its own: a missing or malformed
/// value never discards the other keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct StoredSettings {
    pub minimum_spent: f64,
    pub proposals_min: u32,
    pub proposals_max: u32,
    pub filtering_enabled: bool,
    pub auto_refresh_enabled: bool,
    pub auto_refresh_interval_ms: u64,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            minimum_spent: 1.0,
            proposals_min: 0,
            proposals_max: 100,
            filtering_enabled: true,
            auto_refresh_enabled: true,
            auto_refresh_interval_ms: 60_000,
        }
    }
}

impl From<Value> for StoredSettings {
    fn from(value: Value) -> Self {
        let defaults = Self::default();
        Self {
            minimum_spent: stored_key(&value, "minimumSpent").unwrap_or(defaults.minimum_spent),
            proposals_min: stored_key(&value, "proposalsMin").unwrap_or(defaults.proposals_min),
            proposals_max: stored_key(&value, "proposalsMax").unwrap_or(defaults.proposals_max),
            filtering_enabled: stored_key(&value, "filteringEnabled")
                .unwrap_or(defaults.filtering_enabled),
            auto_refresh_enabled: stored_key(&value, "autoRefreshEnabled")
                .unwrap_or(defaults.auto_refresh_enabled),
            auto_refresh_interval_ms: stored_key(&value, "autoRefreshIntervalMs")
                .unwrap_or(defaults.auto_refresh_interval_ms),
        }
    }
}

fn stored_key<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    let raw = value.get(key)?;
    match T::deserialize(raw) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Ignoring stored setting {}: {}", key, e);
            None
        }
    }
}

/// Payload of a `SETTINGS_UPDATED` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub minimum_spent: f64,
    pub proposals_min: u32,
    pub proposals_max: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filtering_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_refresh_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_refresh_interval_ms: Option<u64>,
}

/// JSON file standing in for the external settings store
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `settings.json` next to the default config file
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SiftError::Config("Cannot determine config directory".to_string()))?;
        Ok(Self::new(config_dir.join("jobsift").join("settings.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored settings. Any failure falls back to the defaults so
    /// startup never blocks on a broken store.
    pub async fn load(&self) -> StoredSettings {
        match self.try_load().await {
            Ok(settings) => {
                tracing::debug!("Loaded stored settings from {:?}", self.path);
                settings
            }
            Err(e) => {
                tracing::warn!("Error loading settings, using defaults: {}", e);
                StoredSettings::default()
            }
        }
    }

    async fn try_load(&self) -> Result<StoredSettings> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SiftError::Io {
                source: e,
                context: format!("Failed to read settings file: {:?}", self.path),
            })?;

        serde_json::from_str(&content).map_err(|e| SiftError::Json {
            source: e,
            context: "Failed to deserialize stored settings".to_string(),
        })
    }

    /// Persist settings, as the editing surface would
    pub async fn store(&self, settings: &StoredSettings) -> Result<()> {
        let payload = serde_json::to_string_pretty(settings).map_err(|e| SiftError::Json {
            source: e,
            context: "Failed to serialize stored settings".to_string(),
        })?;
        tokio::fs::write(&self.path, payload)
            .await
            .map_err(|e| SiftError::Io {
                source: e,
                context: format!("Failed to write settings file: {:?}", self.path),
            })
    }
}
