use std::future::Future;
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Absolute time budget for one operation.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineGuard {
    started: Instant,
    /// `None` when the budget runs past what `Instant` can represent.
    deadline: Option<Instant>,
}

/// Result of racing a future against the deadline.
#[derive(Debug)]
pub enum Guarded<T> {
    Completed(T),
    Expired,
}

impl DeadlineGuard {
    pub fn new(started: Instant, budget: Duration) -> Self {
        Self {
            started,
            deadline: started.checked_add(budget),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline
            .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Run `fut` unless the deadline passes first. A future that is
    /// already complete wins the tie.
    pub async fn race<C, F>(&self, clock: &C, fut: F) -> Guarded<F::Output>
    where
        C: Clock + ?Sized,
        F: Future,
    {
        let remaining = self.remaining(clock.now());
        if remaining.is_zero() {
            return Guarded::Expired;
        }
        tokio::select! {
            biased;
            out = fut => Guarded::Completed(out),
            _ = clock.sleep(remaining) => Guarded::Expired,
        }
    }
}
