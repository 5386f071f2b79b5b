/// Audio preference persistence
///
/// Saves and loads the sound-enabled and music-enabled flags so mute state
/// survives restarts.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PreferencesError;

/// Persisted audio preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPreferences {
    /// Whether sound effects are enabled (not muted)
    pub sound_enabled: bool,

    /// Whether music is enabled (not muted)
    pub music_enabled: bool,

    /// Version of the file format (for future migrations)
    pub version: u32,
}

impl AudioPreferences {
    /// Current preferences version
    pub const VERSION: u32 = 1;
}

impl Default for AudioPreferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            music_enabled: true,
            version: Self::VERSION,
        }
    }
}

/// Durable storage for the two preference flags.
///
/// `load` returns `Ok(None)` when nothing has been stored yet.
pub trait PreferenceStore: Send {
    fn load(&self) -> Result<Option<AudioPreferences>, PreferencesError>;
    fn save(&self, prefs: &AudioPreferences) -> Result<(), PreferencesError>;
}

/// JSON file in the platform config directory
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at `<config dir>/AudioChannels/audio_preferences.json`
    pub fn in_config_dir() -> Result<Self, PreferencesError> {
        Self::default_path()
            .map(Self::new)
            .ok_or(PreferencesError::NoConfigDir)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("AudioChannels").join("audio_preferences.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load(&self) -> Result<Option<AudioPreferences>, PreferencesError> {
        if !self.path.exists() {
            tracing::debug!("No audio preferences found at {}", self.path.display());
            return Ok(None);
        }

        let read_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            PreferencesError::ReadFailed {
                path: self.path.display().to_string(),
                source,
            }
        };
        let json = std::fs::read_to_string(&self.path).map_err(|e| read_failed(Box::new(e)))?;
        let prefs: AudioPreferences =
            serde_json::from_str(&json).map_err(|e| read_failed(Box::new(e)))?;

        if prefs.version != AudioPreferences::VERSION {
            tracing::warn!(
                "Audio preferences version mismatch: expected {}, found {}",
                AudioPreferences::VERSION,
                prefs.version
            );
        }

        tracing::debug!("Loaded audio preferences from {}", self.path.display());
        Ok(Some(prefs))
    }

    fn save(&self, prefs: &AudioPreferences) -> Result<(), PreferencesError> {
        let save_failed = |source: Box<dyn std::error::Error + Send + Sync>| {
            PreferencesError::SaveFailed {
                path: self.path.display().to_string(),
                source,
            }
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(Box::new(e)))?;
        }

        let json = serde_json::to_string_pretty(prefs).map_err(|e| save_failed(Box::new(e)))?;
        std::fs::write(&self.path, json).map_err(|e| save_failed(Box::new(e)))?;

        tracing::debug!("Saved audio preferences to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store for hosts without durable storage, and for tests
#[derive(Default)]
pub struct MemoryPreferenceStore {
    prefs: Mutex<Option<AudioPreferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefs(prefs: AudioPreferences) -> Self {
        Self {
            prefs: Mutex::new(Some(prefs)),
        }
    }

    /// Last saved value, if any
    pub fn stored(&self) -> Option<AudioPreferences> {
        *self.prefs.lock()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Result<Option<AudioPreferences>, PreferencesError> {
        Ok(*self.prefs.lock())
    }

    fn save(&self, prefs: &AudioPreferences) -> Result<(), PreferencesError> {
        *self.prefs.lock() = Some(*prefs);
        Ok(())
    }
}

impl<S: PreferenceStore + Sync> PreferenceStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<AudioPreferences>, PreferencesError> {
        (**self).load()
    }

    fn save(&self, prefs: &AudioPreferences) -> Result<(), PreferencesError> {
        (**self).save(prefs)
    }
}
