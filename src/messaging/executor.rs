/// Audio service
///
/// Runs a [`Scheduler`] on its own thread. Commands, finished loads, the
/// admission tick and completion polls are all multiplexed onto that one
/// thread, so the scheduler itself needs no locking. [`AudioHandle`] is the
/// cloneable, thread-safe front end.

use crossbeam_channel::{at, bounded, never, select, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use super::bus::EventBus;
use super::commands::{Command, ServiceStatus};
use crate::audio_system::{
    AudioBackend, AudioKind, ChannelId, ChannelStatus, FileAssetLoader, LoadOutcome, Rejected,
    RequestId, Scheduler, SoundOptions, StopToken, Submission, Ticker,
};
use crate::config::{AudioCatalog, SchedulerConfig};
use crate::emitter::AudioControl;
use crate::error::{AudioError, ServiceError};
use crate::preferences::PreferenceStore;

pub struct AudioService;

impl AudioService {
    /// Start the service thread. The backend is built on that thread since
    /// output streams cannot move between threads.
    pub fn spawn<B, F, P>(
        config: SchedulerConfig,
        catalog: AudioCatalog,
        preferences: P,
        events: EventBus,
        make_backend: F,
    ) -> Result<AudioHandle, ServiceError>
    where
        B: AudioBackend + 'static,
        F: FnOnce() -> Result<B, AudioError> + Send + 'static,
        P: PreferenceStore + 'static,
    {
        config.validate().map_err(ServiceError::InvalidConfig)?;

        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<(), AudioError>>(1);

        let ticker = Ticker::new(config.tick_interval());
        let tick_token = ticker.token();

        let thread = thread::Builder::new()
            .name("audio-service".to_string())
            .spawn(move || {
                let backend = match make_backend() {
                    Ok(backend) => backend,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let (load_tx, load_rx) = unbounded();
                let pool_size = config.pool_size;
                let mut scheduler = Scheduler::new(config, backend, FileAssetLoader::new(load_tx))
                    .with_catalog(catalog)
                    .with_preferences(preferences)
                    .with_event_bus(events);
                scheduler.init(pool_size);
                let _ = ready_tx.send(Ok(()));

                run(scheduler, command_rx, load_rx, ticker);
            })
            .map_err(ServiceError::ThreadSpawnFailed)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(ServiceError::BackendFailed(e));
            }
            Err(_) => return Err(ServiceError::Stopped),
        }

        Ok(AudioHandle {
            commands: command_tx,
            tick_token,
            thread: Arc::new(Mutex::new(Some(thread))),
        })
    }
}

fn run(
    mut scheduler: Scheduler,
    commands: Receiver<Command>,
    loads: Receiver<LoadOutcome>,
    mut ticker: Ticker,
) {
    tracing::info!("Audio service thread started");

    loop {
        let tick = ticker.receiver().clone();
        let poll = scheduler
            .next_poll_due()
            .map(at)
            .unwrap_or_else(never::<Instant>);

        select! {
            recv(commands) -> msg => match msg {
                Ok(Command::Shutdown) | Err(_) => break,
                Ok(command) => execute(&mut scheduler, command),
            },
            recv(loads) -> outcome => {
                if let Ok(outcome) = outcome {
                    scheduler.on_load_complete(outcome);
                }
            },
            recv(tick) -> _ => {
                // The receiver may have been cloned before the stop
                if !ticker.is_stopped() {
                    scheduler.tick();
                }
            },
            recv(poll) -> _ => scheduler.poll_completions(),
        }
    }

    ticker.stop();
    scheduler.stop_all();
    tracing::info!("Audio service thread stopped");
}

fn execute(scheduler: &mut Scheduler, command: Command) {
    tracing::debug!("Executing command: {}", command.description());

    match command {
        Command::PlaySound { id, options, reply } => {
            let _ = reply.send(scheduler.play_sound(&id, options));
        }
        Command::PlayMusic { id, volume, reply } => {
            let _ = reply.send(scheduler.play_music(&id, volume));
        }
        Command::StopSound { id } => {
            scheduler.stop_sound(&id);
        }
        Command::StopMusic => scheduler.stop_music(),
        Command::Cancel { request } => {
            scheduler.cancel(request);
        }
        Command::SetMuted { kind, muted } => match (kind, muted) {
            (AudioKind::Sound, true) => scheduler.mute_all_sounds(),
            (AudioKind::Sound, false) => scheduler.unmute_all_sounds(),
            (AudioKind::Music, true) => scheduler.mute_all_music(),
            (AudioKind::Music, false) => scheduler.unmute_all_music(),
        },
        Command::SetForeground { in_foreground } => scheduler.set_foreground(in_foreground),
        Command::LoadLazyAudio => scheduler.load_lazy_audio(),
        Command::SetCatalog { catalog } => scheduler.set_catalog(catalog),
        Command::QueryStatus { reply } => {
            let _ = reply.send(status_of(scheduler));
        }
        // Handled by the loop
        Command::Shutdown => {}
    }
}

fn status_of(scheduler: &Scheduler) -> ServiceStatus {
    let pool = scheduler.pool();
    ServiceStatus {
        channels: pool.len(),
        idle: pool.idle_count(),
        queued: scheduler.queue_len(),
        sound_muted: scheduler.is_sound_muted(),
        music_muted: scheduler.is_music_muted(),
        audio_ready: scheduler.is_audio_ready(),
        music_playing: scheduler
            .channel(ChannelId::Music)
            .is_some_and(|music| music.status() == ChannelStatus::Playing),
    }
}

/// Cloneable handle to a running [`AudioService`]
#[derive(Clone)]
pub struct AudioHandle {
    commands: Sender<Command>,
    tick_token: StopToken,
    thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AudioHandle {
    fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands.send(command).map_err(|_| ServiceError::Stopped)
    }

    fn submit(&self, make: impl FnOnce(Sender<Submission>) -> Command) -> Submission {
        let (reply_tx, reply_rx) = bounded(1);
        if self.send(make(reply_tx)).is_err() {
            return Submission::Rejected(Rejected::ServiceStopped);
        }
        reply_rx
            .recv()
            .unwrap_or(Submission::Rejected(Rejected::ServiceStopped))
    }

    pub fn play_sound(&self, id: &str, options: SoundOptions) -> Submission {
        self.submit(|reply| Command::PlaySound {
            id: id.to_string(),
            options,
            reply,
        })
    }

    pub fn play_music(&self, id: &str, volume: f32) -> Submission {
        self.submit(|reply| Command::PlayMusic {
            id: id.to_string(),
            volume,
            reply,
        })
    }

    pub fn stop_sound(&self, id: &str) -> Result<(), ServiceError> {
        self.send(Command::StopSound { id: id.to_string() })
    }

    pub fn stop_music(&self) -> Result<(), ServiceError> {
        self.send(Command::StopMusic)
    }

    pub fn cancel(&self, request: RequestId) -> Result<(), ServiceError> {
        self.send(Command::Cancel { request })
    }

    pub fn set_muted(&self, kind: AudioKind, muted: bool) -> Result<(), ServiceError> {
        self.send(Command::SetMuted { kind, muted })
    }

    pub fn mute_all_sounds(&self) -> Result<(), ServiceError> {
        self.set_muted(AudioKind::Sound, true)
    }

    pub fn unmute_all_sounds(&self) -> Result<(), ServiceError> {
        self.set_muted(AudioKind::Sound, false)
    }

    pub fn mute_all_music(&self) -> Result<(), ServiceError> {
        self.set_muted(AudioKind::Music, true)
    }

    pub fn unmute_all_music(&self) -> Result<(), ServiceError> {
        self.set_muted(AudioKind::Music, false)
    }

    pub fn set_foreground(&self, in_foreground: bool) -> Result<(), ServiceError> {
        self.send(Command::SetForeground { in_foreground })
    }

    pub fn load_lazy_audio(&self) -> Result<(), ServiceError> {
        self.send(Command::LoadLazyAudio)
    }

    pub fn set_catalog(&self, catalog: AudioCatalog) -> Result<(), ServiceError> {
        self.send(Command::SetCatalog { catalog })
    }

    pub fn status(&self) -> Result<ServiceStatus, ServiceError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(Command::QueryStatus { reply: reply_tx })?;
        reply_rx.recv().map_err(|_| ServiceError::Stopped)
    }

    /// Stop the admission tick. Queued requests stay queued; requests that
    /// find an idle channel (or may grow the pool) are still served at once.
    pub fn stop_tick_timer(&self) {
        tracing::info!("Stopping admission tick");
        self.tick_token.stop();
    }

    /// Stop the service and wait for its thread. Later calls are no-ops.
    pub fn shutdown(&self) {
        let _ = self.send(Command::Shutdown);
        if let Some(thread) = self.thread.lock().take() {
            if thread.join().is_err() {
                tracing::error!("Audio service thread panicked");
            }
        }
    }
}

impl AudioControl for AudioHandle {
    fn play_sound(&mut self, id: &str, options: SoundOptions) -> Submission {
        AudioHandle::play_sound(self, id, options)
    }

    fn play_music(&mut self, id: &str, volume: f32) -> Submission {
        AudioHandle::play_music(self, id, volume)
    }

    fn stop_sound(&mut self, id: &str) {
        if let Err(e) = AudioHandle::stop_sound(self, id) {
            tracing::warn!("Failed to stop sound {}: {}", id, e);
        }
    }

    fn stop_music(&mut self) {
        if let Err(e) = AudioHandle::stop_music(self) {
            tracing::warn!("Failed to stop music: {}", e);
        }
    }
}
