/// Command types for the audio service
///
/// Commands represent requests to perform actions (imperative).
/// They are executed on the audio service thread, in the order sent.
use crossbeam_channel::Sender;

use crate::audio_system::{AudioKind, RequestId, SoundOptions, Submission};
use crate::config::AudioCatalog;

/// Audio service commands
pub enum Command {
    /// Submit a sound; the outcome is sent back on `reply`
    PlaySound {
        id: String,
        options: SoundOptions,
        reply: Sender<Submission>,
    },

    PlayMusic {
        id: String,
        volume: f32,
        reply: Sender<Submission>,
    },

    StopSound { id: String },

    StopMusic,

    /// Cancel a single request by id
    Cancel { request: RequestId },

    SetMuted { kind: AudioKind, muted: bool },

    SetForeground { in_foreground: bool },

    LoadLazyAudio,

    SetCatalog { catalog: AudioCatalog },

    /// Snapshot of scheduler state
    QueryStatus { reply: Sender<ServiceStatus> },

    /// Stop the service loop
    Shutdown,
}

/// Point-in-time view of the scheduler, for status displays and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStatus {
    pub channels: usize,
    pub idle: usize,
    pub queued: usize,
    pub sound_muted: bool,
    pub music_muted: bool,
    pub audio_ready: bool,
    pub music_playing: bool,
}

impl ServiceStatus {
    pub fn busy(&self) -> usize {
        self.channels - self.idle
    }
}

impl Command {
    /// Get a human-readable description of the command
    pub fn description(&self) -> String {
        match self {
            Command::PlaySound { id, options, .. } => {
                format!(
                    "Play sound: {} (latency {:?}, must play: {})",
                    id, options.max_latency, options.must_play
                )
            }
            Command::PlayMusic { id, volume, .. } => {
                format!("Play music: {} at {:.2}", id, volume)
            }
            Command::StopSound { id } => format!("Stop sound: {}", id),
            Command::StopMusic => "Stop music".to_string(),
            Command::Cancel { request } => format!("Cancel request {}", request),
            Command::SetMuted { kind, muted } => {
                if *muted {
                    format!("Mute {}", kind)
                } else {
                    format!("Unmute {}", kind)
                }
            }
            Command::SetForeground { in_foreground } => {
                if *in_foreground {
                    "Enter foreground".to_string()
                } else {
                    "Enter background".to_string()
                }
            }
            Command::LoadLazyAudio => "Load lazy audio".to_string(),
            Command::SetCatalog { catalog } => format!("Set catalog ({} entries)", catalog.len()),
            Command::QueryStatus { .. } => "Query status".to_string(),
            Command::Shutdown => "Shut down audio service".to_string(),
        }
    }
}
