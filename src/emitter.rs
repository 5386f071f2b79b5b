/// Sound emitters
///
/// A [`SoundEmitter`] is a small per-object audio component: a list of
/// catalog ids, one of which is current, played either as music or as
/// must-play sounds. It talks to whatever implements [`AudioControl`], so the
/// same emitter works against a [`crate::audio_system::Scheduler`] directly
/// or against an [`crate::messaging::AudioHandle`] on another thread.

use crate::audio_system::{SoundOptions, Submission};

/// Play/stop surface shared by the scheduler and the service handle
pub trait AudioControl {
    fn play_sound(&mut self, id: &str, options: SoundOptions) -> Submission;

    fn play_music(&mut self, id: &str, volume: f32) -> Submission;

    fn stop_sound(&mut self, id: &str);

    fn stop_music(&mut self);
}

#[derive(Debug, Clone)]
pub struct SoundEmitter {
    ids: Vec<String>,
    volume: f32,
    is_music: bool,
    looping: bool,
    max_play_count: Option<u32>,
    play_count: u32,
    index: usize,
}

impl SoundEmitter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
            volume: 1.0,
            is_music: false,
            looping: false,
            max_play_count: None,
            play_count: 0,
            index: 0,
        }
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Play through the music channel instead of the pool
    pub fn as_music(mut self) -> Self {
        self.is_music = true;
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Stop accepting plays after `count` successful ones
    pub fn with_max_play_count(mut self, count: u32) -> Self {
        self.max_play_count = Some(count);
        self
    }

    pub fn play_count(&self) -> u32 {
        self.play_count
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_id(&self) -> Option<&str> {
        self.ids.get(self.index).map(String::as_str)
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_play_count
            .is_some_and(|max| self.play_count >= max)
    }

    /// Make `index` current and play it. Returns `None` when nothing was
    /// submitted (play count used up or index out of range).
    pub fn play(&mut self, audio: &mut dyn AudioControl, index: usize) -> Option<Submission> {
        if self.is_exhausted() {
            tracing::debug!("Emitter play count exhausted ({})", self.play_count);
            return None;
        }
        let Some(id) = self.ids.get(index) else {
            tracing::warn!("Emitter has no sound at index {}", index);
            return None;
        };
        self.index = index;

        let submission = if self.is_music {
            audio.play_music(id, self.volume)
        } else {
            let options = SoundOptions::default()
                .with_volume(self.volume)
                .with_looping(self.looping);
            audio.play_sound(id, options)
        };

        if submission.is_submitted() {
            self.play_count += 1;
        }
        Some(submission)
    }

    pub fn play_current(&mut self, audio: &mut dyn AudioControl) -> Option<Submission> {
        self.play(audio, self.index)
    }

    /// Stop the music channel, or the current sound
    pub fn stop(&self, audio: &mut dyn AudioControl) {
        if self.is_music {
            audio.stop_music();
        } else if let Some(id) = self.current_id() {
            audio.stop_sound(id);
        }
    }
}
