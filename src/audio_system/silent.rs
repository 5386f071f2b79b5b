/// Silent playback backend
///
/// Produces no sound. Used for headless runs (`--silent`) and for driving the
/// scheduler deterministically. Each source's state is observable through a
/// [`SourceProbe`]; a source stops on its own after `play_duration` (if set),
/// when stopped, or when a probe calls [`SourceProbe::finish`].

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::backend::{AudioBackend, AudioClip, PlaybackSource};
use crate::error::AudioError;

#[derive(Debug, Default)]
struct SourceState {
    clip: Option<PathBuf>,
    looping: bool,
    volume: f32,
    playing: bool,
    started_at: Option<Instant>,
    play_count: usize,
    stop_count: usize,
}

/// Read/poke handle onto a silent source
#[derive(Debug, Clone)]
pub struct SourceProbe {
    state: Arc<Mutex<SourceState>>,
}

impl SourceProbe {
    pub fn clip(&self) -> Option<PathBuf> {
        self.state.lock().clip.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    pub fn looping(&self) -> bool {
        self.state.lock().looping
    }

    /// Number of times playback was started
    pub fn play_count(&self) -> usize {
        self.state.lock().play_count
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stop_count
    }

    /// Simulate the clip reaching its end
    pub fn finish(&self) {
        self.state.lock().playing = false;
    }
}

pub struct SilentSource {
    state: Arc<Mutex<SourceState>>,
    play_duration: Option<Duration>,
}

impl PlaybackSource for SilentSource {
    fn bind(&mut self, clip: AudioClip) {
        self.state.lock().clip = Some(clip.path().clone());
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let mut state = self.state.lock();
        if state.clip.is_none() {
            return Err(AudioError::NoClip);
        }
        state.playing = true;
        state.started_at = Some(Instant::now());
        state.play_count += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.stop_count += 1;
    }

    fn is_playing(&self) -> bool {
        let mut state = self.state.lock();
        if let (Some(duration), Some(started_at)) = (self.play_duration, state.started_at) {
            if state.playing && !state.looping && started_at.elapsed() >= duration {
                state.playing = false;
            }
        }
        state.playing
    }
}

/// Backend handing out silent sources
#[derive(Default)]
pub struct SilentBackend {
    play_duration: Option<Duration>,
    probes: Arc<Mutex<Vec<SourceProbe>>>,
}

impl SilentBackend {
    /// Sources play until stopped or finished through a probe
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-looping sources end by themselves after `duration`
    pub fn with_play_duration(duration: Duration) -> Self {
        Self {
            play_duration: Some(duration),
            probes: Arc::default(),
        }
    }

    /// Shared list of probes, in source creation order
    pub fn probes(&self) -> SilentProbes {
        SilentProbes {
            probes: Arc::clone(&self.probes),
        }
    }
}

impl AudioBackend for SilentBackend {
    fn create_source(&mut self) -> Box<dyn PlaybackSource> {
        let state = Arc::new(Mutex::new(SourceState {
            volume: 1.0,
            ..SourceState::default()
        }));
        self.probes.lock().push(SourceProbe {
            state: Arc::clone(&state),
        });
        Box::new(SilentSource {
            state,
            play_duration: self.play_duration,
        })
    }
}

/// Probes for every source a [`SilentBackend`] has created
#[derive(Clone)]
pub struct SilentProbes {
    probes: Arc<Mutex<Vec<SourceProbe>>>,
}

impl SilentProbes {
    pub fn get(&self, index: usize) -> Option<SourceProbe> {
        self.probes.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.probes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.lock().is_empty()
    }
}
