/// Asynchronous asset loading
///
/// Assigning a channel issues a [`LoadTicket`]. Loaders report back with a
/// [`LoadOutcome`] in whatever order loads finish; the scheduler checks the
/// ticket's request id against the channel before using the result.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rodio::Decoder;

use super::backend::AudioClip;
use super::channel::ChannelId;
use super::request::RequestId;
use crate::error::AudioError;

/// Identifies which channel occupant a load was started for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub channel: ChannelId,
    pub request: RequestId,
    pub path: PathBuf,
}

/// Result of a load, delivered back to the scheduler
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub result: Result<AudioClip, AudioError>,
}

/// Starts loads without blocking; completion is reported out of band
pub trait AssetLoader {
    fn load(&mut self, ticket: LoadTicket);
}

type ClipCache = Arc<Mutex<HashMap<PathBuf, AudioClip>>>;

/// Reads files on worker threads and verifies they decode.
///
/// Successfully loaded clips are cached by path, so later requests for the same
/// asset complete without touching the disk.
pub struct FileAssetLoader {
    results: Sender<LoadOutcome>,
    cache: ClipCache,
}

impl FileAssetLoader {
    pub fn new(results: Sender<LoadOutcome>) -> Self {
        Self {
            results,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }

    fn read_clip(path: &PathBuf) -> Result<AudioClip, AudioError> {
        if !path.exists() {
            return Err(AudioError::NotFound(path.display().to_string()));
        }

        let data = std::fs::read(path).map_err(|e| AudioError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        // Decoder needs owned data with a 'static lifetime
        Decoder::new(Cursor::new(data.clone()))
            .map_err(|e| AudioError::DecodeFailed(Box::new(e)))?;

        tracing::debug!("Loaded audio: {} ({} bytes)", path.display(), data.len());
        Ok(AudioClip::new(path.clone(), Arc::new(data)))
    }
}

impl AssetLoader for FileAssetLoader {
    fn load(&mut self, ticket: LoadTicket) {
        let cached = self.cache.lock().get(&ticket.path).cloned();
        if let Some(clip) = cached {
            let _ = self.results.send(LoadOutcome {
                ticket,
                result: Ok(clip),
            });
            return;
        }

        let results = self.results.clone();
        let cache = Arc::clone(&self.cache);
        let worker_ticket = ticket.clone();
        let spawned = std::thread::Builder::new()
            .name("audio-load".to_string())
            .spawn(move || {
                let result = Self::read_clip(&worker_ticket.path);
                if let Ok(clip) = &result {
                    cache.lock().insert(worker_ticket.path.clone(), clip.clone());
                }
                // Receiver gone means the service shut down
                let _ = results.send(LoadOutcome {
                    ticket: worker_ticket,
                    result,
                });
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to start load thread: {}", e);
            let _ = self.results.send(LoadOutcome {
                result: Err(AudioError::LoadFailed {
                    path: ticket.path.display().to_string(),
                    source: Box::new(e),
                }),
                ticket,
            });
        }
    }
}

/// Loader that only records tickets. The host decides when, in what order and
/// with what result each load completes.
#[derive(Clone, Default)]
pub struct QueuedLoader {
    pending: Arc<Mutex<Vec<LoadTicket>>>,
}

impl QueuedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tickets issued so far and not yet taken
    pub fn take_pending(&self) -> Vec<LoadTicket> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl AssetLoader for QueuedLoader {
    fn load(&mut self, ticket: LoadTicket) {
        self.pending.lock().push(ticket);
    }
}
