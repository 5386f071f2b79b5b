/// Playback backend seam
///
/// The scheduler never talks to an audio library directly. Each channel owns a
/// [`PlaybackSource`] created by an [`AudioBackend`]; clips are plain bytes
/// loaded by an asset loader.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AudioError;

/// Encoded audio held in memory, shared between channels playing the same asset
#[derive(Clone)]
pub struct AudioClip {
    path: PathBuf,
    data: Arc<Vec<u8>>,
}

impl AudioClip {
    pub fn new(path: PathBuf, data: Arc<Vec<u8>>) -> Self {
        Self { path, data }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn data(&self) -> &Arc<Vec<u8>> {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioClip")
            .field("path", &self.path)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// One underlying playback resource, reused across many requests
pub trait PlaybackSource {
    /// Replace the bound clip. Does not start playback.
    fn bind(&mut self, clip: AudioClip);

    fn set_looping(&mut self, looping: bool);

    /// Change volume in place without restarting playback
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Start the bound clip from the beginning
    fn play(&mut self) -> Result<(), AudioError>;

    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}

/// Factory for playback sources
pub trait AudioBackend {
    fn create_source(&mut self) -> Box<dyn PlaybackSource>;
}
