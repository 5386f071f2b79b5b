use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// One entry of the audio catalog: a playable asset id and where to load it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub id: String,
    pub path: String,
}

/// Mapping from asset id to its location.
///
/// Serialized as a JSON object keyed by id:
///
/// ```json
/// { "click": { "id": "click", "path": "sfx/click.mp3" } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioCatalog {
    entries: HashMap<String, AudioConfig>,
}

impl AudioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from its JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(ConfigError::ParseFailed)
    }

    /// Load a catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let catalog = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded audio catalog from {} ({} entries)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// Add or replace an entry, keyed by its id
    pub fn insert(&mut self, config: AudioConfig) {
        self.entries.insert(config.id.clone(), config);
    }

    pub fn with_entry(mut self, id: &str, path: &str) -> Self {
        self.insert(AudioConfig {
            id: id.to_string(),
            path: path.to_string(),
        });
        self
    }

    pub fn get(&self, id: &str) -> Option<&AudioConfig> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Tunables for the scheduler and the service loop around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Channels created by `init`
    pub pool_size: usize,

    /// Admission tick period in milliseconds
    pub tick_interval_ms: u64,

    /// Completion poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Extra time past `max_latency` after which a queued, non must-play
    /// request is discarded. `None` keeps requests queued indefinitely.
    pub queue_timeout_ms: Option<u64>,

    /// Reject play requests until `load_lazy_audio` is called
    pub lazy_audio: bool,

    /// Directory catalog paths are resolved against
    pub asset_root: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pool_size: 5,
            tick_interval_ms: 500,
            poll_interval_ms: 100,
            queue_timeout_ms: None,
            lazy_audio: false,
            asset_root: PathBuf::from("."),
        }
    }
}

impl SchedulerConfig {
    /// Load from a JSON file, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(
                "No scheduler config at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: SchedulerConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })?;
        config.validate()?;

        tracing::info!("Loaded scheduler config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn queue_timeout(&self) -> Option<Duration> {
        self.queue_timeout_ms.map(Duration::from_millis)
    }

    /// Resolve a catalog path against the asset root
    pub fn resolve(&self, asset_path: &str) -> PathBuf {
        self.asset_root.join(asset_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
        assert_eq!(config.poll_interval(), Duration::from_millis(100));
        assert_eq!(config.queue_timeout(), None);
        assert!(!config.lazy_audio);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "pool_size": 8, "queue_timeout_ms": 3000 }"#).unwrap();
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.queue_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_zero_tick_interval_is_invalid() {
        let config = SchedulerConfig {
            tick_interval_ms: 0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_parsing() {
        let json = r#"{
            "click": { "id": "click", "path": "sfx/click.mp3" },
            "theme": { "id": "theme", "path": "music/theme.ogg" }
        }"#;
        let catalog = AudioCatalog::from_json_str(json).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("click").unwrap().path, "sfx/click.mp3");
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_catalog_rejects_malformed_json() {
        assert!(AudioCatalog::from_json_str("[1, 2").is_err());
    }

    #[test]
    fn test_resolve_against_asset_root() {
        let config = SchedulerConfig {
            asset_root: PathBuf::from("assets"),
            ..SchedulerConfig::default()
        };
        assert_eq!(config.resolve("sfx/hit.wav"), PathBuf::from("assets/sfx/hit.wav"));
    }
}
