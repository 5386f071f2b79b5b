/// Audio request kinds
///
/// Music plays on the dedicated music channel; sounds compete for pool channels.
use std::fmt;

/// Category of a playback request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioKind {
    /// Background music (dedicated channel, looped, preempting)
    Music,

    /// Sound effect (pooled channel)
    Sound,
}

impl fmt::Display for AudioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioKind::Music => write!(f, "Music"),
            AudioKind::Sound => write!(f, "Sound"),
        }
    }
}

impl AudioKind {
    /// Music is watched by explicit stop/preemption only, never by polling
    pub fn is_polled(&self) -> bool {
        matches!(self, AudioKind::Sound)
    }
}
