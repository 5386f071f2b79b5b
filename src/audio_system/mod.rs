/// Audio system module
///
/// Schedules short sound effects onto a growable pool of playback channels,
/// with a separate channel for music.
///
/// ## Architecture
///
/// ```text
/// Scheduler
///   ├── AdmissionQueue      must-play first, FIFO within a priority
///   ├── ChannelPool
///   │     ├── Channel 0 ─┐
///   │     ├── Channel 1 ─┤ Idle → Loading → Playing → Idle
///   │     └── ...       ─┘
///   ├── Channel (music)     preempted by every play_music
///   ├── CompletionWatcher   polls playing sound channels
///   └── MutePolicy          sound / music / foreground
///
/// AssetLoader ──LoadOutcome──> Scheduler::on_load_complete
/// AudioBackend ──creates──> PlaybackSource (rodio or silent)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let mut scheduler = Scheduler::new(config, RodioBackend::new()?, loader)
///     .with_catalog(catalog);
/// scheduler.init(5);
///
/// let options = SoundOptions::default()
///     .with_max_latency(Duration::from_millis(200))
///     .with_must_play(false);
/// scheduler.play_sound("whistle", options);
///
/// // Driven by the host loop
/// scheduler.tick();
/// scheduler.poll_completions();
/// ```
pub mod backend;
pub mod channel;
pub mod clock;
pub mod loader;
pub mod mute;
pub mod player;
pub mod pool;
pub mod queue;
pub mod request;
pub mod scheduler;
pub mod silent;
pub mod source;
pub mod timer;
pub mod watcher;

// Re-export commonly used types
pub use backend::{AudioBackend, AudioClip, PlaybackSource};
pub use channel::{Channel, ChannelId, ChannelStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use loader::{AssetLoader, FileAssetLoader, LoadOutcome, LoadTicket, QueuedLoader};
pub use mute::MutePolicy;
pub use player::RodioBackend;
pub use pool::ChannelPool;
pub use queue::AdmissionQueue;
pub use request::{Completion, OnComplete, PlayRequest, RequestId, SoundOptions};
pub use scheduler::{Rejected, Scheduler, Submission};
pub use silent::{SilentBackend, SilentProbes, SourceProbe};
pub use source::AudioKind;
pub use timer::{StopToken, Ticker};
pub use watcher::CompletionWatcher;
