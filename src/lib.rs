//! Channel-pooled audio playback scheduling.
//!
//! Sound effects are admitted onto a pool of playback channels by latency and
//! priority; music gets a dedicated channel. See [`audio_system::Scheduler`]
//! for the single-threaded core and [`messaging::AudioService`] for running it
//! on its own thread.

pub mod audio_system;
pub mod config;
pub mod emitter;
pub mod error;
pub mod messaging;
pub mod preferences;

pub use audio_system::{Completion, RequestId, Scheduler, SoundOptions, Submission};
pub use config::{AudioCatalog, SchedulerConfig};
pub use emitter::{AudioControl, SoundEmitter};
pub use messaging::{AudioEvent, AudioHandle, AudioService, EventBus};
