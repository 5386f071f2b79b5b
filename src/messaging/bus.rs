/// Event bus for audio notifications
///
/// Fire-and-forget fan-out: every subscriber gets its own unbounded channel,
/// and publishing never blocks the scheduler.
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::events::AudioEvent;

/// Subscriber ID for tracking subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

struct Subscriber {
    id: SubscriberId,
    sender: Sender<AudioEvent>,
}

/// Shared handle; clones publish to the same subscribers
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
    next_id: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events, returns a receiver and subscription ID
    pub fn subscribe(&self) -> (Receiver<AudioEvent>, SubscriberId) {
        let (tx, rx) = unbounded();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscriber { id, sender: tx });
        (rx, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().retain(|s| s.id != id);
    }

    /// Publish to all subscribers, pruning those whose receiver was dropped
    pub fn publish(&self, event: AudioEvent) {
        tracing::debug!("Publishing audio event: {}", event.description());

        let mut closed = Vec::new();
        for subscriber in self.subscribers.read().iter() {
            if subscriber.sender.try_send(event).is_err() {
                closed.push(subscriber.id);
            }
        }

        if !closed.is_empty() {
            self.subscribers.write().retain(|s| !closed.contains(&s.id));
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let bus = EventBus::new();
        let (_rx, id) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let (rx1, _id1) = bus.subscribe();
        let (rx2, _id2) = bus.subscribe();

        bus.publish(AudioEvent::MusicMuted);

        assert_eq!(rx1.try_recv().unwrap(), AudioEvent::MusicMuted);
        assert_eq!(rx2.try_recv().unwrap(), AudioEvent::MusicMuted);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let bus = EventBus::new();
        let (rx, _id) = bus.subscribe();
        drop(rx);

        bus.publish(AudioEvent::SoundMuted);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus = EventBus::new();
        let other = bus.clone();
        let (rx, _id) = other.subscribe();

        bus.publish(AudioEvent::LazyAudioLoaded);
        assert_eq!(rx.try_recv().unwrap(), AudioEvent::LazyAudioLoaded);
    }
}
