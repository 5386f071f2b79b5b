/// Mute policy
///
/// Global mute and foreground state. Effective volume is zero while the kind
/// is muted or the app is in the background.

use super::source::AudioKind;
use crate::preferences::AudioPreferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutePolicy {
    sound_muted: bool,
    music_muted: bool,
    app_in_foreground: bool,
}

impl MutePolicy {
    pub fn new() -> Self {
        Self {
            sound_muted: false,
            music_muted: false,
            app_in_foreground: true,
        }
    }

    /// Seed mute flags from persisted preferences
    pub fn from_preferences(prefs: &AudioPreferences) -> Self {
        Self {
            sound_muted: !prefs.sound_enabled,
            music_muted: !prefs.music_enabled,
            app_in_foreground: true,
        }
    }

    /// Preferences reflecting the current mute flags
    pub fn to_preferences(&self) -> AudioPreferences {
        AudioPreferences {
            sound_enabled: !self.sound_muted,
            music_enabled: !self.music_muted,
            version: AudioPreferences::VERSION,
        }
    }

    pub fn is_muted(&self, kind: AudioKind) -> bool {
        match kind {
            AudioKind::Sound => self.sound_muted,
            AudioKind::Music => self.music_muted,
        }
    }

    pub fn set_muted(&mut self, kind: AudioKind, muted: bool) {
        match kind {
            AudioKind::Sound => self.sound_muted = muted,
            AudioKind::Music => self.music_muted = muted,
        }
    }

    pub fn is_sound_muted(&self) -> bool {
        self.sound_muted
    }

    pub fn is_music_muted(&self) -> bool {
        self.music_muted
    }

    pub fn is_in_foreground(&self) -> bool {
        self.app_in_foreground
    }

    pub fn set_foreground(&mut self, in_foreground: bool) {
        self.app_in_foreground = in_foreground;
    }

    /// Volume a source of `kind` should actually use for a request volume
    pub fn effective_volume(&self, kind: AudioKind, requested: f32) -> f32 {
        if self.is_muted(kind) || !self.app_in_foreground {
            0.0
        } else {
            requested
        }
    }
}

impl Default for MutePolicy {
    fn default() -> Self {
        Self::new()
    }
}
