/// Completion watcher
///
/// rodio gives no end-of-playback event, so playing sound channels are polled.
/// Each watch is tied to the request that started it; a watch whose channel has
/// moved on to another request is dropped instead of releasing the newcomer.

use std::time::{Duration, Instant};

use super::channel::ChannelId;
use super::request::RequestId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watch {
    pub channel: ChannelId,
    pub request: RequestId,
    pub due: Instant,
}

pub struct CompletionWatcher {
    interval: Duration,
    watches: Vec<Watch>,
}

impl CompletionWatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            watches: Vec::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Schedule the first check one interval from `now`
    pub fn watch(&mut self, channel: ChannelId, request: RequestId, now: Instant) {
        self.watches.push(Watch {
            channel,
            request,
            due: now + self.interval,
        });
    }

    /// Re-arm a watch that found its source still playing
    pub fn rearm(&mut self, watch: Watch, now: Instant) {
        self.watch(watch.channel, watch.request, now);
    }

    /// Remove and return every watch due at `now`
    pub fn take_due(&mut self, now: Instant) -> Vec<Watch> {
        let (due, pending): (Vec<Watch>, Vec<Watch>) =
            self.watches.drain(..).partition(|w| w.due <= now);
        self.watches = pending;
        due
    }

    /// Earliest pending check
    pub fn next_due(&self) -> Option<Instant> {
        self.watches.iter().map(|w| w.due).min()
    }

    /// Drop watches for a request that left its channel
    pub fn forget(&mut self, request: RequestId) {
        self.watches.retain(|w| w.request != request);
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}
