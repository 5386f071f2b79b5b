/// Admission queue
///
/// Pending sound requests waiting for a channel. Must-play requests come first;
/// within the same priority, earlier submissions are served first.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use super::request::{PlayRequest, RequestId};

struct Queued {
    seq: u64,
    request: PlayRequest,
}

impl Queued {
    fn key(&self) -> (bool, Reverse<u64>) {
        (self.request.must_play(), Reverse(self.seq))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
pub struct AdmissionQueue {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, request: PlayRequest) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Queued { seq, request });
    }

    /// Highest-priority request
    pub fn peek(&self) -> Option<&PlayRequest> {
        self.heap.peek().map(|q| &q.request)
    }

    pub fn pop(&mut self) -> Option<PlayRequest> {
        self.heap.pop().map(|q| q.request)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.heap.iter().any(|q| q.request.id() == id)
    }

    /// Remove the request with `id`
    pub fn remove(&mut self, id: RequestId) -> Option<PlayRequest> {
        self.remove_first(|r| r.id() == id)
    }

    /// Remove the highest-priority request playing `asset`
    pub fn remove_by_asset(&mut self, asset: &str) -> Option<PlayRequest> {
        self.remove_first(|r| r.asset() == asset)
    }

    fn remove_first<F>(&mut self, matches: F) -> Option<PlayRequest>
    where
        F: Fn(&PlayRequest) -> bool,
    {
        let target = self
            .heap
            .iter()
            .filter(|q| matches(&q.request))
            .max()
            .map(|q| q.seq)?;

        let mut removed = None;
        let remaining: Vec<Queued> = std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .filter_map(|q| {
                if q.seq == target {
                    removed = Some(q.request);
                    None
                } else {
                    Some(q)
                }
            })
            .collect();
        self.heap = BinaryHeap::from(remaining);
        removed
    }

    /// Take out every non must-play request that has waited longer than its
    /// `max_latency` plus `timeout`
    pub fn drain_expired(&mut self, now: Instant, timeout: Duration) -> Vec<PlayRequest> {
        let (expired, kept): (Vec<Queued>, Vec<Queued>) = std::mem::take(&mut self.heap)
            .into_vec()
            .into_iter()
            .partition(|q| {
                !q.request.must_play()
                    && q.request
                        .max_latency()
                        .checked_add(timeout)
                        .is_some_and(|limit| q.request.waited(now) > limit)
            });
        self.heap = BinaryHeap::from(kept);

        let mut expired: Vec<Queued> = expired;
        expired.sort_by_key(|q| q.seq);
        expired.into_iter().map(|q| q.request).collect()
    }
}
