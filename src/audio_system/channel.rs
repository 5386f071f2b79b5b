/// Playback channels
///
/// A channel is a reusable slot: one playback source plus the request it is
/// currently serving. Its identity outlives any single request.

use std::fmt;

use super::backend::PlaybackSource;
use super::request::{PlayRequest, RequestId};

/// Index of a channel inside its pool. The music channel has its own id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelId {
    Pool(usize),
    Music,
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelId::Pool(index) => write!(f, "channel {}", index),
            ChannelId::Music => write!(f, "music channel"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Idle,
    Loading,
    Playing,
}

/// A reusable playback slot.
///
/// `status == Idle` exactly when no request is assigned.
pub struct Channel {
    id: ChannelId,
    status: ChannelStatus,
    request: Option<PlayRequest>,
    source: Box<dyn PlaybackSource>,
}

impl Channel {
    pub fn new(id: ChannelId, source: Box<dyn PlaybackSource>) -> Self {
        Self {
            id,
            status: ChannelStatus::Idle,
            request: None,
            source,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == ChannelStatus::Idle
    }

    pub fn request(&self) -> Option<&PlayRequest> {
        self.request.as_ref()
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request.as_ref().map(PlayRequest::id)
    }

    /// Whether `id` is the channel's current occupant
    pub fn is_serving(&self, id: RequestId) -> bool {
        self.request_id() == Some(id)
    }

    pub fn source(&self) -> &dyn PlaybackSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn PlaybackSource {
        self.source.as_mut()
    }

    /// Put a request in the slot and mark it Loading.
    ///
    /// Any in-flight load for a previous occupant becomes stale because it no
    /// longer matches the assigned request id.
    pub(crate) fn assign(&mut self, request: PlayRequest) {
        self.status = ChannelStatus::Loading;
        self.request = Some(request);
    }

    pub(crate) fn mark_playing(&mut self) {
        debug_assert!(self.request.is_some());
        self.status = ChannelStatus::Playing;
    }

    /// Stop the source and empty the slot, handing back the retired request
    pub(crate) fn clear(&mut self) -> Option<PlayRequest> {
        let request = self.request.take()?;
        self.status = ChannelStatus::Idle;
        if self.source.is_playing() {
            self.source.stop();
        }
        Some(request)
    }

    /// `status == Idle ⇔ request.is_none()`
    pub fn is_consistent(&self) -> bool {
        self.is_idle() == self.request.is_none()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("request", &self.request)
            .finish()
    }
}
