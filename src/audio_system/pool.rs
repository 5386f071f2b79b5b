/// Channel pool
///
/// Owns the pooled channels and their idle accounting. The pool grows on
/// demand but never shrinks.

use super::backend::AudioBackend;
use super::channel::{Channel, ChannelId, ChannelStatus};
use super::request::{Completion, PlayRequest};

pub struct ChannelPool {
    channels: Vec<Channel>,
    idle_count: usize,
}

impl ChannelPool {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            idle_count: 0,
        }
    }

    /// Pool pre-filled with `size` idle channels
    pub fn with_size(size: usize, backend: &mut dyn AudioBackend) -> Self {
        let mut pool = Self::new();
        for _ in 0..size {
            pool.grow(backend);
        }
        pool
    }

    /// Append a new idle channel
    pub fn grow(&mut self, backend: &mut dyn AudioBackend) -> ChannelId {
        let id = ChannelId::Pool(self.channels.len());
        self.channels.push(Channel::new(id, backend.create_source()));
        self.idle_count += 1;
        tracing::debug!("Pool grew to {} channels", self.channels.len());
        id
    }

    /// First idle channel, growing the pool if none is idle and `force_grow` is set.
    ///
    /// The returned channel is still Idle; the caller must `assign` it.
    pub fn acquire_idle(
        &mut self,
        force_grow: bool,
        backend: &mut dyn AudioBackend,
    ) -> Option<ChannelId> {
        if self.idle_count > 0 {
            if let Some(channel) = self.channels.iter().find(|c| c.is_idle()) {
                return Some(channel.id());
            }
        }
        if force_grow {
            return Some(self.grow(backend));
        }
        None
    }

    /// Move a request into an idle channel (Idle → Loading)
    pub fn assign(&mut self, id: ChannelId, request: PlayRequest) {
        let Some(channel) = self.get_mut(id) else {
            tracing::warn!("Cannot assign {} to unknown {}", request.id(), id);
            return;
        };
        debug_assert!(channel.is_idle(), "assigning to a busy channel");
        channel.assign(request);
        self.idle_count -= 1;
    }

    /// Return a channel to Idle and fire the retiring request's completion.
    ///
    /// No-op (returns false) when the channel is already idle. This is the only
    /// place pooled requests complete, whether they finished or were stopped.
    pub fn release(&mut self, id: ChannelId, completion: Completion) -> bool {
        let Some(request) = self.get_mut(id).and_then(Channel::clear) else {
            return false;
        };
        self.idle_count += 1;
        tracing::debug!(
            "Released {} ({} {}) with {:?}",
            id,
            request.asset(),
            request.id(),
            completion
        );
        request.complete(completion);
        true
    }

    pub fn get(&self, id: ChannelId) -> Option<&Channel> {
        match id {
            ChannelId::Pool(index) => self.channels.get(index),
            ChannelId::Music => None,
        }
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        match id {
            ChannelId::Pool(index) => self.channels.get_mut(index),
            ChannelId::Music => None,
        }
    }

    /// First busy channel whose request plays `asset`
    pub fn find_by_asset(&self, asset: &str) -> Option<ChannelId> {
        self.channels
            .iter()
            .find(|c| c.request().is_some_and(|r| r.asset() == asset))
            .map(Channel::id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn idle_count(&self) -> usize {
        self.idle_count
    }

    pub fn busy_count(&self) -> usize {
        self.channels.len() - self.idle_count
    }

    /// Full scan of the pool invariants
    pub fn check_consistency(&self) -> bool {
        let idle = self
            .channels
            .iter()
            .filter(|c| c.status() == ChannelStatus::Idle)
            .count();
        idle == self.idle_count && self.channels.iter().all(Channel::is_consistent)
    }
}

impl Default for ChannelPool {
    fn default() -> Self {
        Self::new()
    }
}
