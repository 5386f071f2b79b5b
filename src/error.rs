use thiserror::Error;

/// Library errors using thiserror for structured error handling.
///
/// Request-level outcomes (unknown asset, audio not ready) are not errors; they
/// are reported as [`crate::audio_system::Rejected`] values. The enums here cover
/// failures of the surrounding machinery: loading, output, configuration and the
/// service thread.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Audio file not found: {0}")]
    NotFound(String),

    #[error("Failed to decode audio format")]
    DecodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to initialize audio output stream")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Audio playback failed")]
    PlaybackFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("No clip bound to source")]
    NoClip,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to parse audio catalog")]
    ParseFailed(#[source] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum PreferencesError {
    #[error("Failed to get config directory")]
    NoConfigDir,

    #[error("Failed to read preferences from {path}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save preferences to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Audio service is not running")]
    Stopped,

    #[error("Failed to start audio service thread")]
    ThreadSpawnFailed(#[source] std::io::Error),

    #[error("Audio backend failed to start")]
    BackendFailed(#[source] AudioError),

    #[error("Invalid scheduler config")]
    InvalidConfig(#[source] ConfigError),
}
