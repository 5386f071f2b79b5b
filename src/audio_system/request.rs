/// Playback requests
///
/// A request describes one playback intent. It is immutable once created and
/// carries a process-unique id used to tell a channel's current occupant from
/// stale load results.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::source::AudioKind;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique, strictly increasing request identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Allocate the next id. Ids are never reused.
    pub fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a request left its channel (or the queue)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Playback reached its natural end
    Finished,

    /// Stopped or cancelled explicitly
    Stopped,

    /// The asset could not be loaded
    LoadFailed(String),

    /// Discarded from the queue after waiting too long
    Expired,
}

impl Completion {
    pub fn is_finished(&self) -> bool {
        matches!(self, Completion::Finished)
    }
}

/// Completion callback. Any payload is captured by the closure.
pub type OnComplete = Box<dyn FnOnce(Completion) + Send>;

/// Caller-facing options for `play_sound`
pub struct SoundOptions {
    /// Time tolerated in the queue before forced admission
    pub max_latency: Duration,

    /// Allow the pool to grow to serve this request
    pub must_play: bool,

    /// Volume multiplier (0.0-1.0)
    pub volume: f32,

    /// Repeat until stopped
    pub looping: bool,

    pub on_complete: Option<OnComplete>,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            max_latency: Duration::ZERO,
            must_play: true,
            volume: 1.0,
            looping: false,
            on_complete: None,
        }
    }
}

impl SoundOptions {
    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }

    pub fn with_must_play(mut self, must_play: bool) -> Self {
        self.must_play = must_play;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for SoundOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundOptions")
            .field("max_latency", &self.max_latency)
            .field("must_play", &self.must_play)
            .field("volume", &self.volume)
            .field("looping", &self.looping)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// A single playback intent
pub struct PlayRequest {
    id: RequestId,
    kind: AudioKind,
    asset: String,
    path: PathBuf,
    max_latency: Duration,
    must_play: bool,
    volume: f32,
    looping: bool,
    submitted_at: Instant,
    on_complete: Option<OnComplete>,
}

impl PlayRequest {
    pub fn sound(asset: &str, path: PathBuf, options: SoundOptions, now: Instant) -> Self {
        Self {
            id: RequestId::next(),
            kind: AudioKind::Sound,
            asset: asset.to_string(),
            path,
            max_latency: options.max_latency,
            must_play: options.must_play,
            volume: options.volume.clamp(0.0, 1.0),
            looping: options.looping,
            submitted_at: now,
            on_complete: options.on_complete,
        }
    }

    /// Music is always must-play, zero-latency and looped
    pub fn music(asset: &str, path: PathBuf, volume: f32, now: Instant) -> Self {
        Self {
            id: RequestId::next(),
            kind: AudioKind::Music,
            asset: asset.to_string(),
            path,
            max_latency: Duration::ZERO,
            must_play: true,
            volume: volume.clamp(0.0, 1.0),
            looping: true,
            submitted_at: now,
            on_complete: None,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> AudioKind {
        self.kind
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }

    pub fn must_play(&self) -> bool {
        self.must_play
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Time spent waiting since submission
    pub fn waited(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.submitted_at)
    }

    /// Whether the queue deadline has elapsed
    pub fn deadline_elapsed(&self, now: Instant) -> bool {
        self.waited(now) >= self.max_latency
    }

    /// Consume the request and fire its callback, if any
    pub fn complete(mut self, completion: Completion) {
        if let Some(callback) = self.on_complete.take() {
            callback(completion);
        }
    }
}

impl fmt::Debug for PlayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayRequest")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("asset", &self.asset)
            .field("max_latency", &self.max_latency)
            .field("must_play", &self.must_play)
            .field("volume", &self.volume)
            .field("looping", &self.looping)
            .finish()
    }
}
