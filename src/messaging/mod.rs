/// Messaging module for the audio service
///
/// - **Events**: notifications of things that happened (past tense, broadcast)
/// - **Commands**: requests to perform actions (imperative, targeted)
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐    Command     ┌──────────────┐   AudioEvent   ┌───────────┐
/// │ AudioHandle  │ ─────────────> │ AudioService │ ─────────────> │ Event Bus │
/// │ (any thread) │ <─── reply ─── │ (Scheduler)  │                │           │
/// └──────────────┘                └──────────────┘                └───────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let events = EventBus::new();
/// let (rx, _id) = events.subscribe();
///
/// let handle = AudioService::spawn(config, catalog, prefs, events, RodioBackend::new)?;
/// handle.play_sound("whistle", SoundOptions::default());
///
/// while let Ok(event) = rx.recv() {
///     println!("{}", event.description());
/// }
/// ```
pub mod bus;
pub mod commands;
pub mod events;
pub mod executor;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use commands::{Command, ServiceStatus};
pub use events::AudioEvent;
pub use executor::{AudioHandle, AudioService};
