//! Interactive soundboard over the audio service.
//!
//! Reads one command per line from stdin and prints audio events as they
//! arrive. Run with `--silent` to exercise scheduling without an output device.

use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use audio_channels::audio_system::{RequestId, RodioBackend, SilentBackend};
use audio_channels::messaging::{AudioHandle, AudioService, EventBus};
use audio_channels::preferences::FilePreferenceStore;
use audio_channels::{AudioCatalog, SchedulerConfig, SoundOptions, Submission};

const LOG_TARGET_STARTUP: &str = "audio_channels::startup";

/// How long each clip "plays" under `--silent`
const SILENT_CLIP_LENGTH: Duration = Duration::from_secs(2);

const HELP: &str = "\
Commands:
  play <id> [latency_ms] [optional] [loop] [volume]
  music <id> [volume]
  stop <id>
  stopmusic
  cancel                  cancel the last submitted request
  mute sound|music
  unmute sound|music
  background | foreground
  lazy                    load lazily gated audio
  notick                  stop the admission tick
  status
  help
  quit";

struct Args {
    catalog: PathBuf,
    config: Option<PathBuf>,
    silent: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Args {
            catalog: PathBuf::from("audio_catalog.json"),
            config: None,
            silent: false,
        };

        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--catalog" => {
                    args.catalog = iter.next().context("--catalog needs a path")?.into();
                }
                "--config" => {
                    args.config = Some(iter.next().context("--config needs a path")?.into());
                }
                "--silent" => args.silent = true,
                "--help" | "-h" => {
                    println!("Usage: audio-channels [--catalog PATH] [--config PATH] [--silent]");
                    println!("{}", HELP);
                    std::process::exit(0);
                }
                other => bail!("Unknown argument: {}", other),
            }
        }
        Ok(args)
    }
}

/// Initialize tracing with file rotation
///
/// Logs are written to `<config dir>/AudioChannels/logs/`, one file per day.
/// Debug builds also log to stderr.
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("AudioChannels").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "audio-channels.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }

    tracing::info!("Log directory: {}", log_dir.display());
}

fn main() -> Result<()> {
    initialize_tracing();
    tracing::info!(
        target: LOG_TARGET_STARTUP,
        "Starting audio-channels v{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let args = Args::parse()?;
    let config = match &args.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SchedulerConfig::default(),
    };
    let catalog = AudioCatalog::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog {}", args.catalog.display()))?;
    let prefs = FilePreferenceStore::in_config_dir().context("No preferences location")?;

    let events = EventBus::new();
    let (event_rx, _subscription) = events.subscribe();
    std::thread::spawn(move || {
        for event in event_rx {
            println!("* {}", event.description());
        }
    });

    let handle = if args.silent {
        AudioService::spawn(config, catalog, prefs, events, || {
            Ok(SilentBackend::with_play_duration(SILENT_CLIP_LENGTH))
        })
    } else {
        AudioService::spawn(config, catalog, prefs, events, RodioBackend::new)
    }
    .context("Failed to start audio service")?;

    println!("{}", HELP);
    let result = repl(&handle);
    handle.shutdown();
    result
}

fn repl(handle: &AudioHandle) -> Result<()> {
    let stdin = io::stdin();
    let mut last: Option<RequestId> = None;

    print_prompt()?;
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => {}
            ["quit"] | ["exit"] => break,
            ["help"] => println!("{}", HELP),
            ["play", id, rest @ ..] => {
                let submission = handle.play_sound(id, sound_options(rest)?);
                report(&submission, &mut last);
            }
            ["music", id, rest @ ..] => {
                let volume = match rest.first() {
                    Some(v) => v.parse().context("volume must be a number")?,
                    None => 1.0,
                };
                report(&handle.play_music(id, volume), &mut last);
            }
            ["stop", id] => handle.stop_sound(id)?,
            ["stopmusic"] => handle.stop_music()?,
            ["cancel"] => match last.take() {
                Some(request) => handle.cancel(request)?,
                None => println!("Nothing to cancel"),
            },
            ["mute", "sound"] => handle.mute_all_sounds()?,
            ["unmute", "sound"] => handle.unmute_all_sounds()?,
            ["mute", "music"] => handle.mute_all_music()?,
            ["unmute", "music"] => handle.unmute_all_music()?,
            ["background"] => handle.set_foreground(false)?,
            ["foreground"] => handle.set_foreground(true)?,
            ["lazy"] => handle.load_lazy_audio()?,
            ["notick"] => handle.stop_tick_timer(),
            ["status"] => {
                let status = handle.status()?;
                println!(
                    "channels {} (busy {}), queued {}, sound muted {}, music muted {}, music playing {}",
                    status.channels,
                    status.busy(),
                    status.queued,
                    status.sound_muted,
                    status.music_muted,
                    status.music_playing
                );
            }
            _ => println!("Unrecognized command, try `help`"),
        }
        print_prompt()?;
    }
    Ok(())
}

/// `[latency_ms] [optional] [loop] [volume]`, in any order after the id
fn sound_options(words: &[&str]) -> Result<SoundOptions> {
    let mut options = SoundOptions::default().on_complete(|completion| {
        tracing::info!("Sound completed: {:?}", completion);
    });
    let mut numbers = Vec::new();

    for word in words {
        match *word {
            "optional" => options = options.with_must_play(false),
            "loop" => options = options.with_looping(true),
            other => numbers.push(other),
        }
    }

    if let Some(latency) = numbers.first() {
        let ms: u64 = latency.parse().context("latency must be whole milliseconds")?;
        options = options.with_max_latency(Duration::from_millis(ms));
    }
    if let Some(volume) = numbers.get(1) {
        options = options.with_volume(volume.parse().context("volume must be a number")?);
    }
    Ok(options)
}

fn report(submission: &Submission, last: &mut Option<RequestId>) {
    match submission {
        Submission::Submitted(id) => {
            println!("Submitted {}", id);
            *last = Some(*id);
        }
        Submission::Rejected(reason) => println!("Rejected: {:?}", reason),
    }
}

fn print_prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush().context("Failed to flush stdout")
}
