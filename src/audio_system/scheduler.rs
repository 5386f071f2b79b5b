/// Playback scheduler
///
/// Owns the channel pool, the admission queue, the dedicated music channel and
/// the mute state. Everything here runs on one logical thread: loads, ticks and
/// completion polls are delivered back as method calls in whatever order they
/// happen, and the request id check on every load result keeps late results
/// from touching a channel that has moved on.

use std::path::PathBuf;
use std::time::Instant;

use super::backend::AudioBackend;
use super::channel::{Channel, ChannelId, ChannelStatus};
use super::clock::{Clock, SystemClock};
use super::loader::{AssetLoader, LoadOutcome, LoadTicket};
use super::mute::MutePolicy;
use super::pool::ChannelPool;
use super::queue::AdmissionQueue;
use super::request::{Completion, PlayRequest, RequestId, SoundOptions};
use super::source::AudioKind;
use super::watcher::CompletionWatcher;
use crate::config::{AudioCatalog, SchedulerConfig};
use crate::emitter::AudioControl;
use crate::messaging::{AudioEvent, EventBus};
use crate::preferences::{AudioPreferences, MemoryPreferenceStore, PreferenceStore};

/// Why a play request was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    /// `init` has not been called yet
    NotInitialized,

    /// Lazily gated audio has not been loaded yet
    AudioNotReady,

    EmptyId,

    /// No catalog entry for the id
    UnknownAsset(String),

    /// The audio service is no longer running
    ServiceStopped,
}

/// Outcome of a play call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Submitted(RequestId),
    Rejected(Rejected),
}

impl Submission {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Submission::Submitted(_))
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Submission::Submitted(id) => Some(*id),
            Submission::Rejected(_) => None,
        }
    }
}

pub struct Scheduler {
    config: SchedulerConfig,
    catalog: AudioCatalog,
    backend: Box<dyn AudioBackend>,
    loader: Box<dyn AssetLoader>,
    clock: Box<dyn Clock>,
    preferences: Box<dyn PreferenceStore>,
    events: EventBus,
    mute: MutePolicy,
    pool: ChannelPool,
    queue: AdmissionQueue,
    music: Option<Channel>,
    watcher: CompletionWatcher,
    audio_ready: bool,
}

impl Scheduler {
    /// Create an uninitialized scheduler; call [`Scheduler::init`] before playing
    pub fn new<B, L>(config: SchedulerConfig, backend: B, loader: L) -> Self
    where
        B: AudioBackend + 'static,
        L: AssetLoader + 'static,
    {
        let watcher = CompletionWatcher::new(config.poll_interval());
        let audio_ready = !config.lazy_audio;
        Self {
            config,
            catalog: AudioCatalog::new(),
            backend: Box::new(backend),
            loader: Box::new(loader),
            clock: Box::new(SystemClock),
            preferences: Box::new(MemoryPreferenceStore::new()),
            events: EventBus::new(),
            mute: MutePolicy::new(),
            pool: ChannelPool::new(),
            queue: AdmissionQueue::new(),
            music: None,
            watcher,
            audio_ready,
        }
    }

    pub fn with_catalog(mut self, catalog: AudioCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_preferences<P: PreferenceStore + 'static>(mut self, store: P) -> Self {
        self.preferences = Box::new(store);
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Create the music channel and `pool_size` pooled channels, seeding mute
    /// state from stored preferences. Only the first call has any effect.
    pub fn init(&mut self, pool_size: usize) {
        if self.is_initialized() {
            return;
        }

        let prefs = match self.preferences.load() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => {
                let prefs = AudioPreferences::default();
                self.save_preferences(&prefs);
                prefs
            }
            Err(e) => {
                tracing::warn!("Failed to read audio preferences, using defaults: {}", e);
                AudioPreferences::default()
            }
        };
        let in_foreground = self.mute.is_in_foreground();
        self.mute = MutePolicy::from_preferences(&prefs);
        self.mute.set_foreground(in_foreground);

        self.pool = ChannelPool::with_size(pool_size, self.backend.as_mut());
        self.music = Some(Channel::new(ChannelId::Music, self.backend.create_source()));

        tracing::info!(
            "Audio scheduler initialized: {} channels, sound muted: {}, music muted: {}",
            pool_size,
            self.mute.is_sound_muted(),
            self.mute.is_music_muted()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.music.is_some()
    }

    /// Replace the id → asset mapping
    pub fn set_catalog(&mut self, catalog: AudioCatalog) {
        tracing::info!("Audio catalog set ({} entries)", catalog.len());
        self.catalog = catalog;
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Submit a sound. Served at once when a channel is idle (or when it is
    /// must-play with zero latency, growing the pool), queued otherwise.
    pub fn play_sound(&mut self, id: &str, options: SoundOptions) -> Submission {
        let path = match self.resolve(id, AudioKind::Sound) {
            Ok(path) => path,
            Err(rejected) => return Submission::Rejected(rejected),
        };

        let force_grow = options.max_latency.is_zero() && options.must_play;
        let request = PlayRequest::sound(id, path, options, self.clock.now());
        let request_id = request.id();

        // Channels freed since the last tick go to requests already waiting
        self.admit_opportunistic();

        match self.pool.acquire_idle(force_grow, self.backend.as_mut()) {
            Some(channel) => self.start(channel, request),
            None => {
                tracing::debug!(
                    "No idle channel for {} {}, queued ({} waiting)",
                    id,
                    request_id,
                    self.queue.len() + 1
                );
                self.queue.push(request);
            }
        }

        Submission::Submitted(request_id)
    }

    /// Play music on the dedicated channel, preempting whatever it was playing
    pub fn play_music(&mut self, id: &str, volume: f32) -> Submission {
        let path = match self.resolve(id, AudioKind::Music) {
            Ok(path) => path,
            Err(rejected) => return Submission::Rejected(rejected),
        };

        let request = PlayRequest::music(id, path, volume, self.clock.now());
        let request_id = request.id();
        self.retire_music(Completion::Stopped);
        self.start(ChannelId::Music, request);
        Submission::Submitted(request_id)
    }

    /// Stop the music source. A music load still in flight is abandoned.
    pub fn stop_music(&mut self) {
        if self.retire_music(Completion::Stopped) {
            tracing::debug!("Music stopped");
        }
    }

    /// Stop the first channel playing `id`; if none is, drop the first queued
    /// request for it instead. Completions fire as [`Completion::Stopped`].
    pub fn stop_sound(&mut self, id: &str) -> bool {
        if id.is_empty() {
            tracing::warn!("Ignoring stop for empty sound id");
            return false;
        }
        if self.catalog.get(id).is_none() {
            tracing::warn!("Couldn't find audio config for sound {}", id);
            return false;
        }

        if let Some(channel) = self.pool.find_by_asset(id) {
            return self.release(channel, Completion::Stopped);
        }
        if let Some(request) = self.queue.remove_by_asset(id) {
            tracing::debug!("Cancelled queued {} {}", id, request.id());
            request.complete(Completion::Stopped);
            return true;
        }
        false
    }

    /// Cancel one request wherever it is: queued, on a pooled channel, or on the
    /// music channel
    pub fn cancel(&mut self, request_id: RequestId) -> bool {
        if let Some(request) = self.queue.remove(request_id) {
            request.complete(Completion::Stopped);
            return true;
        }

        let pooled = self
            .pool
            .iter()
            .find(|c| c.is_serving(request_id))
            .map(Channel::id);
        if let Some(channel) = pooled {
            return self.release(channel, Completion::Stopped);
        }

        let is_music = self
            .music
            .as_ref()
            .is_some_and(|music| music.is_serving(request_id));
        if is_music {
            return self.retire_music(Completion::Stopped);
        }
        false
    }

    /// Stop everything: queued requests, pooled channels and music all
    /// complete as [`Completion::Stopped`]
    pub fn stop_all(&mut self) {
        while let Some(request) = self.queue.pop() {
            request.complete(Completion::Stopped);
        }
        let busy: Vec<ChannelId> = self
            .pool
            .iter()
            .filter(|c| !c.is_idle())
            .map(Channel::id)
            .collect();
        for channel in busy {
            self.release(channel, Completion::Stopped);
        }
        self.retire_music(Completion::Stopped);
    }

    /// Admission cycle: serve overdue requests (growing the pool for must-play
    /// ones), then fill any remaining idle channels in priority order.
    pub fn tick(&mut self) {
        if !self.is_initialized() {
            return;
        }
        let now = self.clock.now();

        if let Some(timeout) = self.config.queue_timeout() {
            for request in self.queue.drain_expired(now, timeout) {
                tracing::debug!("Queued {} {} expired", request.asset(), request.id());
                request.complete(Completion::Expired);
            }
        }

        if self.queue.is_empty() {
            return;
        }
        self.admit_overdue(now);
        self.admit_opportunistic();
    }

    /// Serve requests whose deadline has passed, strictly in queue order
    fn admit_overdue(&mut self, now: Instant) {
        while let Some(head) = self.queue.peek() {
            if !head.deadline_elapsed(now) {
                break;
            }
            let force_grow = head.must_play();
            let Some(channel) = self.pool.acquire_idle(force_grow, self.backend.as_mut()) else {
                break;
            };
            if let Some(request) = self.queue.pop() {
                self.start(channel, request);
            }
        }
    }

    /// Serve whatever fits in already-idle channels, strictly in queue order
    fn admit_opportunistic(&mut self) {
        while !self.queue.is_empty() {
            let Some(channel) = self.pool.acquire_idle(false, self.backend.as_mut()) else {
                break;
            };
            if let Some(request) = self.queue.pop() {
                self.start(channel, request);
            }
        }
    }

    /// Assign a request to a channel and start loading its asset
    fn start(&mut self, channel: ChannelId, request: PlayRequest) {
        let ticket = LoadTicket {
            channel,
            request: request.id(),
            path: request.path().clone(),
        };
        tracing::debug!("Assigning {} {} to {}", request.asset(), request.id(), channel);

        match channel {
            ChannelId::Music => match self.music.as_mut() {
                Some(music) => music.assign(request),
                None => return,
            },
            ChannelId::Pool(_) => self.pool.assign(channel, request),
        }
        self.loader.load(ticket);
    }

    /// Apply a finished load, unless the channel has since moved on
    pub fn on_load_complete(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { ticket, result } = outcome;
        let mute = self.mute;

        let Some(channel) = self.channel_mut(ticket.channel) else {
            return;
        };
        let Some((kind, looping, volume)) = channel
            .request()
            .filter(|r| r.id() == ticket.request)
            .map(|r| (r.kind(), r.looping(), r.volume()))
        else {
            tracing::trace!("Discarding stale load {} for {}", ticket.request, ticket.channel);
            return;
        };

        let started = result.and_then(|clip| {
            let source = channel.source_mut();
            source.bind(clip);
            source.set_looping(looping);
            source.set_volume(mute.effective_volume(kind, volume));
            source.play()
        });

        match started {
            Ok(()) => {
                channel.mark_playing();
                if kind.is_polled() {
                    let now = self.clock.now();
                    self.watcher.watch(ticket.channel, ticket.request, now);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to play {}: {}", ticket.path.display(), e);
                self.release(ticket.channel, Completion::LoadFailed(e.to_string()));
            }
        }
    }

    /// Check every due completion watch, releasing channels whose source ended
    pub fn poll_completions(&mut self) {
        let now = self.clock.now();
        for watch in self.watcher.take_due(now) {
            let still_playing = match self.pool.get(watch.channel) {
                Some(channel)
                    if channel.is_serving(watch.request)
                        && channel.status() == ChannelStatus::Playing =>
                {
                    channel.source().is_playing()
                }
                _ => continue,
            };

            if still_playing {
                self.watcher.rearm(watch, now);
            } else {
                tracing::debug!("Audio source finished on {}", watch.channel);
                self.release(watch.channel, Completion::Finished);
            }
        }
    }

    /// Earliest pending completion check, for event loops to sleep until
    pub fn next_poll_due(&self) -> Option<Instant> {
        self.watcher.next_due()
    }

    fn release(&mut self, channel: ChannelId, completion: Completion) -> bool {
        match channel {
            ChannelId::Music => self.retire_music(completion),
            ChannelId::Pool(_) => {
                let request_id = self.pool.get(channel).and_then(Channel::request_id);
                let released = self.pool.release(channel, completion);
                if let Some(id) = request_id {
                    self.watcher.forget(id);
                }
                released
            }
        }
    }

    fn retire_music(&mut self, completion: Completion) -> bool {
        match self.music.as_mut().and_then(Channel::clear) {
            Some(request) => {
                request.complete(completion);
                true
            }
            None => false,
        }
    }

    pub fn mute_all_sounds(&mut self) {
        self.set_muted(AudioKind::Sound, true);
    }

    pub fn unmute_all_sounds(&mut self) {
        self.set_muted(AudioKind::Sound, false);
    }

    pub fn mute_all_music(&mut self) {
        self.set_muted(AudioKind::Music, true);
    }

    pub fn unmute_all_music(&mut self) {
        self.set_muted(AudioKind::Music, false);
    }

    fn set_muted(&mut self, kind: AudioKind, muted: bool) {
        self.mute.set_muted(kind, muted);
        let prefs = self.mute.to_preferences();
        self.save_preferences(&prefs);
        tracing::info!("Setting {} mute - {}", kind, muted);
        self.refresh_volumes(kind);
        self.events.publish(AudioEvent::mute_changed(kind, muted));
    }

    /// App moved to the background (false) or foreground (true)
    pub fn set_foreground(&mut self, in_foreground: bool) {
        self.mute.set_foreground(in_foreground);
        tracing::debug!("App in foreground: {}", in_foreground);
        self.refresh_volumes(AudioKind::Music);
        self.refresh_volumes(AudioKind::Sound);
    }

    pub fn is_sound_muted(&self) -> bool {
        self.mute.is_sound_muted()
    }

    pub fn is_music_muted(&self) -> bool {
        self.mute.is_music_muted()
    }

    /// Open the lazy audio gate. Publishes once.
    pub fn load_lazy_audio(&mut self) {
        if self.audio_ready {
            return;
        }
        self.audio_ready = true;
        tracing::info!("Lazy audio loaded");
        self.events.publish(AudioEvent::LazyAudioLoaded);
    }

    pub fn is_audio_ready(&self) -> bool {
        self.audio_ready
    }

    /// Reapply effective volume to every playing channel of `kind`, in place
    fn refresh_volumes(&mut self, kind: AudioKind) {
        let mute = self.mute;
        let channels = self.pool.iter_mut().chain(self.music.as_mut());
        for channel in channels {
            if channel.status() != ChannelStatus::Playing {
                continue;
            }
            let Some(volume) = channel
                .request()
                .filter(|r| r.kind() == kind)
                .map(|r| mute.effective_volume(kind, r.volume()))
            else {
                continue;
            };
            channel.source_mut().set_volume(volume);
        }
    }

    fn save_preferences(&self, prefs: &AudioPreferences) {
        if let Err(e) = self.preferences.save(prefs) {
            tracing::warn!("Failed to save audio preferences: {}", e);
        }
    }

    fn resolve(&self, id: &str, kind: AudioKind) -> Result<PathBuf, Rejected> {
        if !self.is_initialized() {
            tracing::warn!("Audio not initialized, ignoring {} {}", kind, id);
            return Err(Rejected::NotInitialized);
        }
        if !self.audio_ready {
            return Err(Rejected::AudioNotReady);
        }
        if id.is_empty() {
            return Err(Rejected::EmptyId);
        }
        match self.catalog.get(id) {
            Some(entry) => Ok(self.config.resolve(&entry.path)),
            None => {
                tracing::warn!("Couldn't find audio config for {} {}", kind, id);
                Err(Rejected::UnknownAsset(id.to_string()))
            }
        }
    }

    fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        match id {
            ChannelId::Music => self.music.as_mut(),
            ChannelId::Pool(_) => self.pool.get_mut(id),
        }
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        match id {
            ChannelId::Music => self.music.as_ref(),
            ChannelId::Pool(_) => self.pool.get(id),
        }
    }

    pub fn pool(&self) -> &ChannelPool {
        &self.pool
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_queued(&self, id: RequestId) -> bool {
        self.queue.contains(id)
    }

    /// Channel currently holding `id`, if any
    pub fn channel_of(&self, id: RequestId) -> Option<ChannelId> {
        self.pool
            .iter()
            .chain(self.music.as_ref())
            .find(|c| c.is_serving(id))
            .map(Channel::id)
    }

    /// Pool and channel invariants hold
    pub fn check_invariants(&self) -> bool {
        self.pool.check_consistency() && self.music.as_ref().map_or(true, Channel::is_consistent)
    }
}

impl AudioControl for Scheduler {
    fn play_sound(&mut self, id: &str, options: SoundOptions) -> Submission {
        Scheduler::play_sound(self, id, options)
    }

    fn play_music(&mut self, id: &str, volume: f32) -> Submission {
        Scheduler::play_music(self, id, volume)
    }

    fn stop_sound(&mut self, id: &str) {
        Scheduler::stop_sound(self, id);
    }

    fn stop_music(&mut self) {
        Scheduler::stop_music(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_system::backend::AudioClip;
    use crate::audio_system::clock::ManualClock;
    use crate::audio_system::loader::QueuedLoader;
    use crate::audio_system::silent::{SilentBackend, SilentProbes, SourceProbe};
    use crate::error::AudioError;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    const POOL_SIZE: usize = 2;

    type Log = Arc<Mutex<Vec<(&'static str, Completion)>>>;

    struct Harness {
        scheduler: Scheduler,
        clock: ManualClock,
        loader: QueuedLoader,
        probes: SilentProbes,
        prefs: Arc<MemoryPreferenceStore>,
        log: Log,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_config(SchedulerConfig::default())
        }

        fn with_config(config: SchedulerConfig) -> Self {
            Self::build(config, Arc::new(MemoryPreferenceStore::new()))
        }

        fn build(config: SchedulerConfig, prefs: Arc<MemoryPreferenceStore>) -> Self {
            let backend = SilentBackend::new();
            let probes = backend.probes();
            let loader = QueuedLoader::new();
            let clock = ManualClock::new();
            let catalog = AudioCatalog::new()
                .with_entry("a", "a.wav")
                .with_entry("b", "b.wav")
                .with_entry("c", "c.wav")
                .with_entry("d", "d.wav")
                .with_entry("theme", "theme.ogg")
                .with_entry("boss", "boss.ogg");

            let mut scheduler = Scheduler::new(config, backend, loader.clone())
                .with_catalog(catalog)
                .with_clock(clock.clone())
                .with_preferences(Arc::clone(&prefs));
            scheduler.init(POOL_SIZE);

            Self {
                scheduler,
                clock,
                loader,
                probes,
                prefs,
                log: Arc::default(),
            }
        }

        fn options(&self, name: &'static str) -> SoundOptions {
            let log = Arc::clone(&self.log);
            SoundOptions::default().on_complete(move |completion| {
                log.lock().push((name, completion));
            })
        }

        fn play(&mut self, name: &'static str, options: SoundOptions) -> RequestId {
            self.scheduler
                .play_sound(name, options)
                .request_id()
                .expect("sound should be submitted")
        }

        /// Complete every pending load successfully, in issue order
        fn load_all(&mut self) {
            for ticket in self.loader.take_pending() {
                self.complete(ticket);
            }
        }

        fn complete(&mut self, ticket: LoadTicket) {
            let clip = AudioClip::new(ticket.path.clone(), Arc::new(vec![0u8; 8]));
            self.scheduler.on_load_complete(LoadOutcome {
                ticket,
                result: Ok(clip),
            });
        }

        /// Pool channels use probes 0..POOL_SIZE, the music channel the next
        /// one, grown channels the rest
        fn probe(&self, channel: ChannelId) -> SourceProbe {
            let index = match channel {
                ChannelId::Pool(i) if i < POOL_SIZE => i,
                ChannelId::Pool(i) => i + 1,
                ChannelId::Music => POOL_SIZE,
            };
            self.probes.get(index).unwrap()
        }

        fn log(&self) -> Vec<(&'static str, Completion)> {
            self.log.lock().clone()
        }

        fn assert_invariants(&self) {
            let pool = self.scheduler.pool();
            assert!(self.scheduler.check_invariants());
            assert_eq!(pool.idle_count() + pool.busy_count(), pool.len());
        }
    }

    #[test]
    fn test_play_before_init_is_rejected() {
        let mut scheduler = Scheduler::new(
            SchedulerConfig::default(),
            SilentBackend::new(),
            QueuedLoader::new(),
        )
        .with_catalog(AudioCatalog::new().with_entry("a", "a.wav"));

        assert_eq!(
            scheduler.play_sound("a", SoundOptions::default()),
            Submission::Rejected(Rejected::NotInitialized)
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut h = Harness::new();
        h.scheduler.init(10);
        assert_eq!(h.scheduler.pool().len(), POOL_SIZE);
        assert_eq!(h.probes.len(), POOL_SIZE + 1);
    }

    #[test]
    fn test_unknown_and_empty_ids_are_rejected() {
        let mut h = Harness::new();
        assert_eq!(
            h.scheduler.play_sound("nope", SoundOptions::default()),
            Submission::Rejected(Rejected::UnknownAsset("nope".to_string()))
        );
        assert_eq!(
            h.scheduler.play_sound("", SoundOptions::default()),
            Submission::Rejected(Rejected::EmptyId)
        );
        assert_eq!(h.loader.pending_count(), 0);
    }

    #[test]
    fn test_fast_path_plays_after_load() {
        let mut h = Harness::new();
        let options = h.options("a").with_volume(0.5);
        let id = h.play("a", options);

        let channel = h.scheduler.channel_of(id).unwrap();
        assert_eq!(h.scheduler.channel(channel).unwrap().status(), ChannelStatus::Loading);

        h.load_all();
        let probe = h.probe(channel);
        assert_eq!(h.scheduler.channel(channel).unwrap().status(), ChannelStatus::Playing);
        assert!(probe.is_playing());
        assert_eq!(probe.volume(), 0.5);
        assert_eq!(probe.clip(), Some(PathBuf::from("./a.wav")));
        h.assert_invariants();
    }

    #[test]
    fn test_natural_finish_releases_channel() {
        let mut h = Harness::new();
        let options = h.options("a");
        let id = h.play("a", options);
        let channel = h.scheduler.channel_of(id).unwrap();
        h.load_all();

        h.clock.advance(Duration::from_millis(100));
        h.scheduler.poll_completions();
        assert!(h.log().is_empty(), "still playing, watch re-armed");
        assert!(h.scheduler.next_poll_due().is_some());

        h.probe(channel).finish();
        h.clock.advance(Duration::from_millis(100));
        h.scheduler.poll_completions();

        assert_eq!(h.log(), vec![("a", Completion::Finished)]);
        assert!(h.scheduler.channel(channel).unwrap().is_idle());
        assert!(h.scheduler.next_poll_due().is_none());
        h.assert_invariants();
    }

    #[test]
    fn test_looping_sound_needs_explicit_stop() {
        let mut h = Harness::new();
        let options = h.options("a").with_looping(true);
        let id = h.play("a", options);
        let channel = h.scheduler.channel_of(id).unwrap();
        h.load_all();
        assert!(h.probe(channel).looping());

        for _ in 0..5 {
            h.clock.advance(Duration::from_millis(100));
            h.scheduler.poll_completions();
        }
        assert!(h.log().is_empty());

        assert!(h.scheduler.stop_sound("a"));
        assert_eq!(h.log(), vec![("a", Completion::Stopped)]);
    }

    #[test]
    fn test_stop_sound_fires_completion_exactly_once() {
        let mut h = Harness::new();
        let options = h.options("a");
        let id = h.play("a", options);
        let channel = h.scheduler.channel_of(id).unwrap();
        h.load_all();

        assert!(h.scheduler.stop_sound("a"));
        assert!(h.scheduler.channel(channel).unwrap().is_idle());
        assert!(!h.probe(channel).is_playing());

        assert!(!h.scheduler.stop_sound("a"));
        h.clock.advance(Duration::from_millis(100));
        h.scheduler.poll_completions();

        assert_eq!(h.log(), vec![("a", Completion::Stopped)]);
        h.assert_invariants();
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut h = Harness::new();
        let options = h.options("a");
        let r1 = h.play("a", options);
        let channel = h.scheduler.channel_of(r1).unwrap();
        let r1_ticket = h.loader.take_pending().remove(0);

        // Released and reassigned before R1's load returns
        assert!(h.scheduler.stop_sound("a"));
        let options = h.options("b");
        let r2 = h.play("b", options);
        assert_eq!(h.scheduler.channel_of(r2), Some(channel));

        h.complete(r1_ticket);
        let state = h.scheduler.channel(channel).unwrap();
        assert_eq!(state.status(), ChannelStatus::Loading);
        assert_eq!(state.request_id(), Some(r2));
        assert_eq!(h.probe(channel).play_count(), 0);

        h.load_all();
        assert_eq!(h.probe(channel).clip(), Some(PathBuf::from("./b.wav")));
        assert_eq!(h.probe(channel).play_count(), 1);
        h.assert_invariants();
    }

    #[test]
    fn test_load_failure_releases_channel() {
        let mut h = Harness::new();
        let options = h.options("a");
        let id = h.play("a", options);
        let channel = h.scheduler.channel_of(id).unwrap();
        let ticket = h.loader.take_pending().remove(0);

        h.scheduler.on_load_complete(LoadOutcome {
            ticket,
            result: Err(AudioError::NotFound("a.wav".to_string())),
        });

        assert!(h.scheduler.channel(channel).unwrap().is_idle());
        let log = h.log();
        assert_eq!(log.len(), 1);
        assert!(matches!(log[0], ("a", Completion::LoadFailed(_))));
        h.assert_invariants();
    }

    #[test]
    fn test_first_tick_grows_for_overdue_must_play() {
        let mut h = Harness::new();
        let optional = SoundOptions::default().with_must_play(false);
        for name in ["a", "b"] {
            let options = SoundOptions::default().with_must_play(false).with_looping(true);
            h.play(name, options);
        }
        h.load_all();
        assert_eq!(h.scheduler.pool().idle_count(), 0);

        let must_play = SoundOptions::default()
            .with_must_play(true)
            .with_max_latency(Duration::from_millis(1));
        let a = h.play("c", must_play);
        let b = h.play("d", optional.with_max_latency(Duration::from_millis(5000)));
        assert_eq!(h.scheduler.queue_len(), 2);

        h.clock.advance(Duration::from_millis(500));
        h.scheduler.tick();

        assert_eq!(h.scheduler.pool().len(), 3);
        assert!(h.scheduler.channel_of(a).is_some());
        assert!(h.scheduler.is_queued(b));
        h.assert_invariants();

        // B waits for an opportunistic pass once something goes idle
        h.clock.advance(Duration::from_millis(500));
        h.scheduler.tick();
        assert!(h.scheduler.is_queued(b));

        h.scheduler.stop_sound("a");
        h.clock.advance(Duration::from_millis(500));
        h.scheduler.tick();
        assert_eq!(h.scheduler.channel_of(b), Some(ChannelId::Pool(0)));
        assert_eq!(h.scheduler.pool().len(), 3);
        h.assert_invariants();
    }

    #[test]
    fn test_zero_latency_must_play_grows_immediately() {
        let mut h = Harness::new();
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default());
        }
        let c = h.play("c", SoundOptions::default());

        assert_eq!(h.scheduler.pool().len(), 3);
        assert_eq!(h.scheduler.channel_of(c), Some(ChannelId::Pool(2)));
        assert_eq!(h.scheduler.queue_len(), 0);
    }

    #[test]
    fn test_must_play_served_in_submission_order() {
        let mut h = Harness::new();
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default().with_looping(true));
        }
        h.load_all();

        let waiting = SoundOptions::default().with_max_latency(Duration::from_secs(60));
        let first = h.play("c", waiting);
        let waiting = SoundOptions::default().with_max_latency(Duration::from_secs(60));
        let second = h.play("d", waiting);

        h.scheduler.stop_sound("a");
        h.scheduler.tick();
        assert!(h.scheduler.channel_of(first).is_some());
        assert!(h.scheduler.is_queued(second));
    }

    #[test]
    fn test_queued_request_gets_freed_channel_before_new_submission() {
        let mut h = Harness::new();
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default().with_looping(true));
        }
        h.load_all();

        let waiting = SoundOptions::default().with_max_latency(Duration::from_secs(60));
        let first = h.play("c", waiting);
        assert!(h.scheduler.stop_sound("a"));

        // Submitted before any tick has refilled the freed channel
        let waiting = SoundOptions::default().with_max_latency(Duration::from_secs(60));
        let second = h.play("d", waiting);

        assert_eq!(h.scheduler.channel_of(first), Some(ChannelId::Pool(0)));
        assert!(h.scheduler.is_queued(second));
        h.scheduler.tick();
        assert!(h.scheduler.is_queued(second));
        h.assert_invariants();
    }

    #[test]
    fn test_stop_all_completes_everything() {
        let mut h = Harness::new();
        h.scheduler.play_music("theme", 1.0);
        for name in ["a", "b"] {
            let options = h.options(name).with_looping(true);
            h.play(name, options);
        }
        h.load_all();
        let options = h.options("c").with_max_latency(Duration::from_secs(60));
        h.play("c", options);

        h.scheduler.stop_all();

        assert_eq!(h.scheduler.queue_len(), 0);
        assert_eq!(h.scheduler.pool().idle_count(), POOL_SIZE);
        assert!(h.scheduler.channel(ChannelId::Music).unwrap().is_idle());
        assert!(!h.probe(ChannelId::Music).is_playing());

        let mut log = h.log();
        log.sort_by_key(|(name, _)| *name);
        assert_eq!(
            log,
            vec![
                ("a", Completion::Stopped),
                ("b", Completion::Stopped),
                ("c", Completion::Stopped),
            ]
        );
        h.assert_invariants();
    }

    #[test]
    fn test_deadline_pass_keeps_head_of_line() {
        let mut h = Harness::new();
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default().with_looping(true));
        }
        h.load_all();

        // Head has an elapsed deadline but may not grow the pool
        let head = h.play(
            "c",
            SoundOptions::default()
                .with_must_play(false)
                .with_max_latency(Duration::from_millis(10)),
        );
        let behind = h.play(
            "d",
            SoundOptions::default()
                .with_must_play(false)
                .with_max_latency(Duration::from_millis(10)),
        );

        h.clock.advance(Duration::from_millis(500));
        h.scheduler.tick();
        assert_eq!(h.scheduler.pool().len(), POOL_SIZE);
        assert!(h.scheduler.is_queued(head));
        assert!(h.scheduler.is_queued(behind));

        h.scheduler.stop_sound("b");
        h.scheduler.tick();
        assert_eq!(h.scheduler.channel_of(head), Some(ChannelId::Pool(1)));
        assert!(h.scheduler.is_queued(behind));
    }

    #[test]
    fn test_queue_timeout_expires_optional_requests() {
        let config = SchedulerConfig {
            queue_timeout_ms: Some(1000),
            ..SchedulerConfig::default()
        };
        let mut h = Harness::with_config(config);
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default().with_looping(true));
        }
        h.load_all();

        let options = h
            .options("c")
            .with_must_play(false)
            .with_max_latency(Duration::from_millis(500));
        let optional = h.play("c", options);
        let required = h.play(
            "d",
            SoundOptions::default()
                .with_must_play(true)
                .with_max_latency(Duration::from_secs(30)),
        );

        h.clock.advance(Duration::from_millis(1600));
        h.scheduler.tick();

        assert!(!h.scheduler.is_queued(optional));
        assert!(h.scheduler.is_queued(required));
        assert_eq!(h.log(), vec![("c", Completion::Expired)]);
    }

    #[test]
    fn test_cancel_queued_request() {
        let mut h = Harness::new();
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default().with_looping(true));
        }
        let options = h.options("c").with_must_play(false);
        let queued = h.play("c", options);

        assert!(h.scheduler.cancel(queued));
        assert!(!h.scheduler.is_queued(queued));
        assert!(!h.scheduler.cancel(queued));
        assert_eq!(h.log(), vec![("c", Completion::Stopped)]);
    }

    #[test]
    fn test_stop_sound_falls_back_to_queue() {
        let mut h = Harness::new();
        for name in ["a", "b"] {
            h.play(name, SoundOptions::default().with_looping(true));
        }
        let options = h.options("c").with_must_play(false);
        h.play("c", options);

        assert!(h.scheduler.stop_sound("c"));
        assert_eq!(h.scheduler.queue_len(), 0);
        assert_eq!(h.log(), vec![("c", Completion::Stopped)]);
    }

    #[test]
    fn test_mute_toggle_keeps_playback() {
        let mut h = Harness::new();
        let id = h.play("a", SoundOptions::default().with_volume(0.8));
        let channel = h.scheduler.channel_of(id).unwrap();
        h.load_all();
        let probe = h.probe(channel);

        h.scheduler.mute_all_sounds();
        assert_eq!(probe.volume(), 0.0);
        assert!(probe.is_playing());

        h.scheduler.unmute_all_sounds();
        assert_eq!(probe.volume(), 0.8);
        assert_eq!(probe.play_count(), 1);
        assert_eq!(probe.stop_count(), 0);
    }

    #[test]
    fn test_mute_publishes_and_persists() {
        let mut h = Harness::new();
        let (rx, _id) = h.scheduler.events().subscribe();

        h.scheduler.mute_all_music();
        assert!(h.scheduler.is_music_muted());
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::MusicMuted);
        assert!(!h.prefs.stored().unwrap().music_enabled);

        h.scheduler.mute_all_sounds();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SoundMuted);
        assert!(!h.prefs.stored().unwrap().sound_enabled);

        h.scheduler.unmute_all_sounds();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::SoundUnmuted);
        assert!(h.prefs.stored().unwrap().sound_enabled);
    }

    #[test]
    fn test_init_seeds_mute_from_preferences() {
        let prefs = Arc::new(MemoryPreferenceStore::with_prefs(AudioPreferences {
            sound_enabled: false,
            music_enabled: false,
            version: AudioPreferences::VERSION,
        }));
        let mut h = Harness::build(SchedulerConfig::default(), prefs);
        assert!(h.scheduler.is_sound_muted());
        assert!(h.scheduler.is_music_muted());

        let id = h.play("a", SoundOptions::default());
        let channel = h.scheduler.channel_of(id).unwrap();
        h.load_all();
        assert_eq!(h.probe(channel).volume(), 0.0);
    }

    #[test]
    fn test_init_writes_default_preferences() {
        let h = Harness::new();
        assert_eq!(h.prefs.stored(), Some(AudioPreferences::default()));
    }

    #[test]
    fn test_background_silences_and_restores() {
        let mut h = Harness::new();
        h.scheduler.play_music("theme", 0.6);
        let id = h.play("a", SoundOptions::default().with_volume(0.9));
        let channel = h.scheduler.channel_of(id).unwrap();
        h.load_all();

        h.scheduler.set_foreground(false);
        assert_eq!(h.probe(ChannelId::Music).volume(), 0.0);
        assert_eq!(h.probe(channel).volume(), 0.0);

        h.scheduler.set_foreground(true);
        assert_eq!(h.probe(ChannelId::Music).volume(), 0.6);
        assert_eq!(h.probe(channel).volume(), 0.9);
    }

    #[test]
    fn test_music_preemption_and_stale_music_load() {
        let mut h = Harness::new();
        let first = h.scheduler.play_music("theme", 1.0).request_id().unwrap();
        let first_ticket = h.loader.take_pending().remove(0);

        let second = h.scheduler.play_music("boss", 1.0).request_id().unwrap();
        h.complete(first_ticket);
        assert_eq!(h.scheduler.channel_of(first), None);
        assert_eq!(h.probe(ChannelId::Music).play_count(), 0);

        h.load_all();
        let probe = h.probe(ChannelId::Music);
        assert_eq!(h.scheduler.channel_of(second), Some(ChannelId::Music));
        assert_eq!(probe.clip(), Some(PathBuf::from("./boss.ogg")));
        assert!(probe.looping());
        assert!(probe.is_playing());

        // Music is never polled
        assert!(h.scheduler.next_poll_due().is_none());
        assert_eq!(h.scheduler.queue_len(), 0);
        assert_eq!(h.scheduler.pool().idle_count(), POOL_SIZE);
    }

    #[test]
    fn test_stop_music_abandons_pending_load() {
        let mut h = Harness::new();
        h.scheduler.play_music("theme", 1.0);
        h.scheduler.stop_music();
        h.load_all();

        let music = h.scheduler.channel(ChannelId::Music).unwrap();
        assert!(music.is_idle());
        assert_eq!(h.probe(ChannelId::Music).play_count(), 0);
        h.assert_invariants();
    }

    #[test]
    fn test_lazy_audio_gate() {
        let config = SchedulerConfig {
            lazy_audio: true,
            ..SchedulerConfig::default()
        };
        let mut h = Harness::with_config(config);
        let (rx, _id) = h.scheduler.events().subscribe();

        assert_eq!(
            h.scheduler.play_sound("a", SoundOptions::default()),
            Submission::Rejected(Rejected::AudioNotReady)
        );

        h.scheduler.load_lazy_audio();
        h.scheduler.load_lazy_audio();
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::LazyAudioLoaded);
        assert!(rx.try_recv().is_err());
        assert!(h.scheduler.play_sound("a", SoundOptions::default()).is_submitted());
    }

    #[test]
    fn test_stale_watch_does_not_release_new_occupant() {
        let mut h = Harness::new();
        let first = h.play("a", SoundOptions::default());
        let channel = h.scheduler.channel_of(first).unwrap();
        h.load_all();

        // Reassign before the first poll; the new occupant is still loading
        h.scheduler.stop_sound("a");
        let second = h.play("b", SoundOptions::default());
        assert_eq!(h.scheduler.channel_of(second), Some(channel));

        h.clock.advance(Duration::from_millis(100));
        h.scheduler.poll_completions();
        assert_eq!(h.scheduler.channel_of(second), Some(channel));
    }
}
