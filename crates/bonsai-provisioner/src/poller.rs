use std::future::Future;
use std::time::Duration;

use bonsai_core::config::ReconcileSettings;
use bonsai_core::models::Cluster;

use crate::cancel::CancelToken;
use crate::clock::Clock;
use crate::deadline::{DeadlineGuard, Guarded};
use crate::error::ApiError;
use crate::predicate::{Convergence, ConvergencePredicate};

/// Fixed-interval retry policy bounded by a deadline and, optionally, an
/// attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&ReconcileSettings::default())
    }
}

impl From<&ReconcileSettings> for RetryPolicy {
    fn from(settings: &ReconcileSettings) -> Self {
        Self {
            interval: settings.poll_interval(),
            timeout: settings.timeout(),
            max_attempts: settings.max_attempts,
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether another fetch may run after `attempts` have been made.
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The predicate returned `Ready` or `NotFound`.
    Converged(Convergence),
    Failed(String),
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Last successfully fetched cluster. A later not-found or error never
    /// clears it.
    pub last: Option<Cluster>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Sequential fetch → classify → sleep loop.
#[derive(Debug)]
pub struct StatePoller<'a, C: Clock + ?Sized> {
    clock: &'a C,
    policy: RetryPolicy,
}

impl<'a, C: Clock + ?Sized> StatePoller<'a, C> {
    pub fn new(clock: &'a C, policy: RetryPolicy) -> Self {
        Self { clock, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Poll with a deadline of `policy.timeout` from now.
    pub async fn poll<F, Fut, P>(
        &self,
        fetch: F,
        predicate: &P,
        cancel: &mut CancelToken,
    ) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Cluster, ApiError>>,
        P: ConvergencePredicate + ?Sized,
    {
        let guard = DeadlineGuard::new(self.clock.now(), self.policy.timeout);
        self.poll_within(guard, fetch, predicate, cancel).await
    }

    /// Poll until the predicate reports a terminal result, `guard` expires,
    /// the attempt budget runs out, or `cancel` fires.
    ///
    /// The first fetch runs immediately; cancellation is observed before
    /// it and at every sleep.
    pub async fn poll_within<F, Fut, P>(
        &self,
        guard: DeadlineGuard,
        mut fetch: F,
        predicate: &P,
        cancel: &mut CancelToken,
    ) -> PollReport
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Cluster, ApiError>>,
        P: ConvergencePredicate + ?Sized,
    {
        let mut attempts: u32 = 0;
        let mut last: Option<Cluster> = None;

        let outcome = loop {
            if cancel.is_cancelled() {
                break PollOutcome::Cancelled;
            }
            if !self.policy.allows_attempt(attempts) {
                break PollOutcome::TimedOut;
            }

            let observed = match guard.race(self.clock, fetch()).await {
                Guarded::Completed(observed) => observed,
                Guarded::Expired => break PollOutcome::TimedOut,
            };
            attempts += 1;

            let verdict = predicate.classify(&observed);
            tracing::debug!(
                attempt = attempts,
                verdict = ?verdict,
                state = ?observed.as_ref().ok().and_then(|c| c.state.as_ref()),
                "poll"
            );
            if let Ok(cluster) = observed {
                last = Some(cluster);
            }

            match verdict {
                Convergence::Ready | Convergence::NotFound => {
                    break PollOutcome::Converged(verdict);
                }
                Convergence::Failed(reason) => break PollOutcome::Failed(reason),
                Convergence::InProgress => {}
            }

            if !self.policy.allows_attempt(attempts) {
                break PollOutcome::TimedOut;
            }

            // The next poll races the deadline.
            let wait = self
                .policy
                .interval
                .min(guard.remaining(self.clock.now()));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break PollOutcome::Cancelled,
                _ = self.clock.sleep(wait) => {}
            }
            if guard.is_expired(self.clock.now()) {
                break PollOutcome::TimedOut;
            }
        };

        PollReport {
            outcome,
            last,
            attempts,
            elapsed: guard.elapsed(self.clock.now()),
        }
    }
}
