/// Audio notifications
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers.
use crate::audio_system::AudioKind;

/// Notifications published by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    SoundMuted,
    SoundUnmuted,
    MusicMuted,
    MusicUnmuted,

    /// Lazily gated audio became available
    LazyAudioLoaded,
}

impl AudioEvent {
    /// Event announcing a mute change for `kind`
    pub fn mute_changed(kind: AudioKind, muted: bool) -> Self {
        match (kind, muted) {
            (AudioKind::Sound, true) => AudioEvent::SoundMuted,
            (AudioKind::Sound, false) => AudioEvent::SoundUnmuted,
            (AudioKind::Music, true) => AudioEvent::MusicMuted,
            (AudioKind::Music, false) => AudioEvent::MusicUnmuted,
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> &'static str {
        match self {
            AudioEvent::SoundMuted => "Sound muted",
            AudioEvent::SoundUnmuted => "Sound unmuted",
            AudioEvent::MusicMuted => "Music muted",
            AudioEvent::MusicUnmuted => "Music unmuted",
            AudioEvent::LazyAudioLoaded => "Lazy audio loaded",
        }
    }
}
