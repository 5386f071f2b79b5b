/// Cancellable recurring timer
///
/// A [`Ticker`] yields a message every period on a crossbeam receiver that can
/// sit in a `select!` loop. Stopping it through any clone of its
/// [`StopToken`] turns the receiver into one that never fires.

use crossbeam_channel::{never, tick, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared stop flag for a ticker
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

pub struct Ticker {
    period: Duration,
    receiver: Receiver<Instant>,
    token: StopToken,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            receiver: tick(period),
            token: StopToken::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn token(&self) -> StopToken {
        self.token.clone()
    }

    /// Receiver to select on. Never fires once the token is stopped.
    pub fn receiver(&mut self) -> &Receiver<Instant> {
        if self.token.is_stopped() {
            self.receiver = never();
        }
        &self.receiver
    }

    pub fn stop(&self) {
        self.token.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_stopped()
    }
}
