//! Create / update / delete flows.
//!
//! Each flow issues one mutating call, polls the cluster until the
//! operation's predicate converges, then merges the observed state with
//! what the caller already knew:
//!
//! ```text
//! Issuing ──► Polling ──► Merging ──► Done
//!    │           ├──────────────────► Failed
//!    └──► Failed └──────────────────► TimedOut
//! ```
//!
//! Mutating-call failures are never retried. Only "not visible yet"
//! answers during polling are.

use std::time::Duration;

use bonsai_core::config::ReconcileSettings;
use bonsai_core::models::{Cluster, ClusterDescriptor, ClusterSnapshot, OperationKind};

use crate::api::ClusterApi;
use crate::cancel::CancelToken;
use crate::clock::{Clock, TokioClock};
use crate::deadline::DeadlineGuard;
use crate::error::{format_err_chain, ApiError, ProvisionerError};
use crate::merge::{merge, overlay_desired, seal_access};
use crate::poller::{PollOutcome, PollReport, RetryPolicy, StatePoller};
use crate::predicate::{
    AcceptanceMarker, CreateConvergence, DeleteConvergence, UnavailableMarkers,
    UpdateConvergence,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Issuing,
    Polling,
    Merging,
    Done,
    Failed,
    TimedOut,
}

/// Per-operation bookkeeping. Owned by exactly one flow and dropped when
/// it returns.
#[derive(Debug)]
pub struct OperationContext {
    pub kind: OperationKind,
    pub cluster: String,
    pub deadline: DeadlineGuard,
    pub interval: Duration,
    pub phase: Phase,
    /// What the caller would persist if the operation stopped now.
    pub best_known: Option<ClusterSnapshot>,
}

impl OperationContext {
    pub fn new(
        kind: OperationKind,
        cluster: impl Into<String>,
        started: std::time::Instant,
        policy: &RetryPolicy,
    ) -> Self {
        Self {
            kind,
            cluster: cluster.into(),
            deadline: DeadlineGuard::new(started, policy.timeout),
            interval: policy.interval,
            phase: Phase::Issuing,
            best_known: None,
        }
    }

    pub fn enter(&mut self, phase: Phase) {
        tracing::debug!(
            kind = %self.kind,
            cluster = %self.cluster,
            from = ?self.phase,
            to = ?phase,
            "phase transition"
        );
        self.phase = phase;
    }

    fn partial(&self) -> Option<Box<ClusterSnapshot>> {
        self.best_known.clone().map(Box::new)
    }
}

/// Drives one cluster operation to convergence.
///
/// Credentials and endpoint are baked into `api`; the driver never reads
/// ambient configuration. Callers must serialize operations against the
/// same cluster.
#[derive(Debug)]
pub struct ReconciliationDriver<A, C = TokioClock> {
    api: A,
    clock: C,
    policy: RetryPolicy,
    markers: UnavailableMarkers,
    acceptance: AcceptanceMarker,
}

impl<A: ClusterApi> ReconciliationDriver<A, TokioClock> {
    pub fn new(api: A, settings: &ReconcileSettings) -> Self {
        Self {
            api,
            clock: TokioClock,
            policy: RetryPolicy::from(settings),
            markers: UnavailableMarkers::default(),
            acceptance: AcceptanceMarker::default(),
        }
    }
}

impl<A: ClusterApi, C: Clock> ReconciliationDriver<A, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> ReconciliationDriver<A, C2> {
        ReconciliationDriver {
            api: self.api,
            clock,
            policy: self.policy,
            markers: self.markers,
            acceptance: self.acceptance,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_markers(mut self, markers: UnavailableMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_acceptance(mut self, acceptance: AcceptanceMarker) -> Self {
        self.acceptance = acceptance;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Create a cluster and wait until it is readable and placed.
    ///
    /// On timeout or cancellation the error carries the best-known
    /// snapshot (at least the identifier and credentials) so the caller
    /// can persist it.
    pub async fn create(
        &self,
        desired: &ClusterDescriptor,
        mut cancel: CancelToken,
    ) -> Result<ClusterSnapshot, ProvisionerError> {
        let kind = OperationKind::Create;
        let mut ctx = OperationContext::new(kind, &desired.name, self.clock.now(), &self.policy);

        tracing::info!(kind = %kind, name = %desired.name, "issuing create");
        let created = match self.api.create(desired.create_opts()).await {
            Ok(created) => created,
            Err(err) => {
                ctx.enter(Phase::Failed);
                return Err(issue_failed(kind, &desired.name, err));
            }
        };
        tracing::debug!(message = %created.message, monitor = %created.monitor, "create accepted");

        let mut seed = ClusterSnapshot::from_created(&created);
        if !seed.has_identifier() {
            ctx.enter(Phase::Failed);
            return Err(ProvisionerError::MissingIdentifier { kind });
        }
        overlay_desired(&mut seed, desired);
        seal_access(&mut seed);
        ctx.cluster = seed.id.clone();

        self.await_created(ctx, &seed, desired, &mut cancel).await
    }

    /// Pick up a create that stopped before converging, e.g. after a
    /// timeout whose partial snapshot was persisted. Nothing is issued;
    /// polling resumes against the stored identifier with `prior` as the
    /// merge base.
    pub async fn resume_create(
        &self,
        prior: &ClusterSnapshot,
        desired: &ClusterDescriptor,
        mut cancel: CancelToken,
    ) -> Result<ClusterSnapshot, ProvisionerError> {
        let kind = OperationKind::Create;
        if !prior.has_identifier() {
            return Err(ProvisionerError::MissingIdentifier { kind });
        }
        let ctx = OperationContext::new(kind, &prior.id, self.clock.now(), &self.policy);

        tracing::info!(kind = %kind, cluster = %prior.id, state = ?prior.state, "resuming create");
        self.await_created(ctx, prior, desired, &mut cancel).await
    }

    /// Whether `snapshot` records a cluster that finished creating: it was
    /// read at least once, its state has settled and its space resolved.
    pub fn is_settled(&self, snapshot: &ClusterSnapshot) -> bool {
        snapshot.observed_at.is_some()
            && snapshot
                .state
                .as_ref()
                .is_none_or(|state| state.is_terminal_for(OperationKind::Create))
            && !self.markers.matches(&snapshot.space.path)
            && !self.markers.matches(&snapshot.space.uri)
    }

    async fn await_created(
        &self,
        mut ctx: OperationContext,
        seed: &ClusterSnapshot,
        desired: &ClusterDescriptor,
        cancel: &mut CancelToken,
    ) -> Result<ClusterSnapshot, ProvisionerError> {
        ctx.best_known = Some(seed.clone());
        ctx.enter(Phase::Polling);
        let predicate = CreateConvergence::new(self.markers.clone());
        let report = self.poll(&ctx, &seed.id, &predicate, cancel).await;

        if let Some(cluster) = &report.last {
            let mut observed = merge(Some(seed), self.observe(cluster));
            overlay_desired(&mut observed, desired);
            ctx.best_known = Some(observed);
        }

        match report.outcome {
            PollOutcome::Converged(_) => {
                ctx.enter(Phase::Merging);
                let snapshot = ctx.best_known.take().unwrap_or_else(|| seed.clone());
                ctx.enter(Phase::Done);
                self.log_done(&ctx, &report);
                Ok(snapshot)
            }
            _ => Err(self.unconverged(&mut ctx, report)),
        }
    }

    /// Change name and/or plan, then wait until both are visible.
    ///
    /// `prior` is the snapshot the caller holds; its identifier and
    /// credentials survive into the result.
    pub async fn update(
        &self,
        slug: &str,
        desired: &ClusterDescriptor,
        prior: Option<&ClusterSnapshot>,
        mut cancel: CancelToken,
    ) -> Result<ClusterSnapshot, ProvisionerError> {
        let kind = OperationKind::Update;
        if slug.trim().is_empty() {
            return Err(ProvisionerError::MissingIdentifier { kind });
        }
        let mut ctx = OperationContext::new(kind, slug, self.clock.now(), &self.policy);
        ctx.best_known = prior.cloned();

        let opts = desired.update_opts();
        tracing::info!(kind = %kind, cluster = %slug, name = %opts.name, plan = ?opts.plan, "issuing update");
        let response = match self.api.update(slug, opts).await {
            Ok(response) => response,
            Err(err) => {
                ctx.enter(Phase::Failed);
                return Err(issue_failed(kind, slug, err));
            }
        };

        if !self.acceptance.accepts(&response.message) {
            ctx.enter(Phase::Failed);
            tracing::warn!(cluster = %slug, message = %response.message, "update not acknowledged");
            return Err(ProvisionerError::AcceptanceRejected {
                cluster: slug.to_string(),
                message: response.message,
            });
        }

        ctx.enter(Phase::Polling);
        let predicate = UpdateConvergence::new(desired.name.clone(), self.markers.clone());
        let report = self.poll(&ctx, slug, &predicate, &mut cancel).await;

        if let Some(cluster) = &report.last {
            ctx.best_known = Some(merge(prior, self.observe(cluster)));
        }

        match report.outcome {
            PollOutcome::Converged(_) => {
                ctx.enter(Phase::Merging);
                let snapshot = ctx
                    .best_known
                    .take()
                    .ok_or_else(|| ProvisionerError::NotFound {
                        cluster: slug.to_string(),
                    })?;
                ctx.enter(Phase::Done);
                self.log_done(&ctx, &report);
                Ok(snapshot)
            }
            _ => Err(self.unconverged(&mut ctx, report)),
        }
    }

    /// Destroy a cluster and wait until reads report it gone or
    /// deprovisioned. A timeout is an error: deletion was not confirmed.
    pub async fn delete(&self, slug: &str, mut cancel: CancelToken) -> Result<(), ProvisionerError> {
        let kind = OperationKind::Delete;
        if slug.trim().is_empty() {
            return Err(ProvisionerError::MissingIdentifier { kind });
        }
        let mut ctx = OperationContext::new(kind, slug, self.clock.now(), &self.policy);

        tracing::info!(kind = %kind, cluster = %slug, "issuing destroy");
        match self.api.destroy(slug).await {
            Ok(response) => {
                tracing::debug!(cluster = %slug, message = %response.message, "destroy accepted");
            }
            // Already gone; polling confirms it.
            Err(ApiError::NotFound) => {
                tracing::info!(cluster = %slug, "cluster already absent");
            }
            Err(err) => {
                ctx.enter(Phase::Failed);
                return Err(issue_failed(kind, slug, err));
            }
        }

        ctx.enter(Phase::Polling);
        let report = self.poll(&ctx, slug, &DeleteConvergence, &mut cancel).await;

        if let Some(cluster) = &report.last {
            ctx.best_known = Some(self.observe(cluster));
        }

        match report.outcome {
            PollOutcome::Converged(_) => {
                ctx.best_known = None;
                ctx.enter(Phase::Done);
                self.log_done(&ctx, &report);
                Ok(())
            }
            _ => Err(self.unconverged(&mut ctx, report)),
        }
    }

    /// Refresh a snapshot with one read; no polling.
    pub async fn read(&self, prior: &ClusterSnapshot) -> Result<ClusterSnapshot, ProvisionerError> {
        let kind = OperationKind::Read;
        if !prior.has_identifier() {
            return Err(ProvisionerError::MissingIdentifier { kind });
        }

        let cluster = self
            .api
            .get_by_slug(&prior.id)
            .await
            .map_err(|err| ProvisionerError::from_api(kind, &prior.id, err))?;
        tracing::debug!(cluster = %prior.id, state = ?cluster.state, "read cluster");

        Ok(merge(Some(prior), self.observe(&cluster)))
    }

    async fn poll<P>(
        &self,
        ctx: &OperationContext,
        slug: &str,
        predicate: &P,
        cancel: &mut CancelToken,
    ) -> PollReport
    where
        P: crate::predicate::ConvergencePredicate,
    {
        let poller = StatePoller::new(&self.clock, self.policy);
        poller
            .poll_within(ctx.deadline, || self.api.get_by_slug(slug), predicate, cancel)
            .await
    }

    fn observe(&self, cluster: &Cluster) -> ClusterSnapshot {
        ClusterSnapshot::from_cluster(cluster, self.clock.timestamp())
    }

    fn elapsed(&self, ctx: &OperationContext) -> Duration {
        ctx.deadline.elapsed(self.clock.now())
    }

    fn log_done(&self, ctx: &OperationContext, report: &PollReport) {
        tracing::info!(
            kind = %ctx.kind,
            cluster = %ctx.cluster,
            attempts = report.attempts,
            elapsed_ms = millis(self.elapsed(ctx)),
            "converged"
        );
    }

    fn unconverged(&self, ctx: &mut OperationContext, report: PollReport) -> ProvisionerError {
        let elapsed = self.elapsed(ctx);
        let attempts = report.attempts;
        match report.outcome {
            PollOutcome::TimedOut => {
                ctx.enter(Phase::TimedOut);
                tracing::warn!(
                    kind = %ctx.kind,
                    cluster = %ctx.cluster,
                    attempts,
                    elapsed_ms = millis(elapsed),
                    "timed out awaiting convergence"
                );
                ProvisionerError::ConvergenceTimeout {
                    kind: ctx.kind,
                    cluster: ctx.cluster.clone(),
                    elapsed,
                    attempts,
                    partial: ctx.partial(),
                }
            }
            PollOutcome::Cancelled => {
                ctx.enter(Phase::Failed);
                tracing::warn!(kind = %ctx.kind, cluster = %ctx.cluster, "operation cancelled");
                ProvisionerError::Cancelled {
                    kind: ctx.kind,
                    cluster: ctx.cluster.clone(),
                    elapsed,
                    partial: ctx.partial(),
                }
            }
            PollOutcome::Failed(reason) => {
                ctx.enter(Phase::Failed);
                ProvisionerError::ConvergenceFailed {
                    kind: ctx.kind,
                    cluster: ctx.cluster.clone(),
                    elapsed,
                    reason,
                }
            }
            PollOutcome::Converged(verdict) => ProvisionerError::ConvergenceFailed {
                kind: ctx.kind,
                cluster: ctx.cluster.clone(),
                elapsed,
                reason: format!("unexpected terminal verdict {verdict:?}"),
            },
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Errors from the initial mutating call. Nothing here is retried.
fn issue_failed(kind: OperationKind, cluster: &str, err: ApiError) -> ProvisionerError {
    match err {
        ApiError::Validation { .. } => ProvisionerError::from_api(kind, cluster, err),
        other => ProvisionerError::UnexpectedRemote {
            kind,
            cluster: cluster.to_string(),
            message: format_err_chain(&other),
        },
    }
}
