use std::fmt;
use std::time::{Duration, Instant};

use crate::api::BoxFuture;

/// Time source for the poller and deadline guard.
///
/// Production code uses [`TokioClock`]; tests inject a clock whose
/// `sleep` advances virtual time so polling runs without real waits.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Monotonic instant for elapsed/deadline comparisons.
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()>;

    /// Wall-clock timestamp stamped onto observed snapshots.
    fn timestamp(&self) -> jiff::Timestamp {
        jiff::Timestamp::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'_, ()> {
        (**self).sleep(duration)
    }

    fn timestamp(&self) -> jiff::Timestamp {
        (**self).timestamp()
    }
}
