//! bonsai-provisioner
//!
//! Lifecycle reconciliation for managed search clusters: turns a single
//! create/update/delete intent into a bounded sequence of polls that ends
//! on an externally observed state.
//!
//! Public API:
//! - `ReconciliationDriver`: create / update / delete / read one cluster
//! - `provision()`: load stored snapshot → create or update → flush
//! - `destroy()`: delete the stored cluster and forget its snapshot

pub mod api;
pub mod cancel;
pub mod clock;
pub mod deadline;
pub mod driver;
pub mod error;
pub mod merge;
pub mod persistence;
pub mod poller;
pub mod predicate;

use bonsai_core::models::{ClusterDescriptor, ClusterSnapshot};

pub use crate::api::ClusterApi;
pub use crate::cancel::{CancelHandle, CancelToken};
pub use crate::clock::{Clock, TokioClock};
pub use crate::driver::ReconciliationDriver;
pub use crate::error::{ApiError, ProvisionerError};
pub use crate::persistence::SnapshotStore;
pub use crate::poller::RetryPolicy;

/// Bring the stored cluster in line with `desired`.
///
/// No stored snapshot → create. A stored snapshot whose mutable fields
/// already match → refresh with a single read, or keep polling if it was
/// persisted before the cluster settled. Otherwise → update. The
/// resulting snapshot is flushed; on timeout or cancellation the partial
/// snapshot carried by the error is flushed before the error is returned.
pub async fn provision<A: ClusterApi, C: Clock>(
    store: &SnapshotStore,
    driver: &ReconciliationDriver<A, C>,
    desired: &ClusterDescriptor,
    cancel: CancelToken,
) -> Result<ClusterSnapshot, ProvisionerError> {
    let prior = store.load().await?;

    let result = match &prior {
        None => driver.create(desired, cancel).await,
        // An earlier create gave up before the cluster settled.
        Some(prior) if in_sync(prior, desired) && !driver.is_settled(prior) => {
            driver.resume_create(prior, desired, cancel).await
        }
        Some(prior) if in_sync(prior, desired) => match driver.read(prior).await {
            Err(ProvisionerError::NotFound { cluster }) => {
                tracing::warn!(cluster = %cluster, "stored cluster no longer exists, recreating");
                store.remove().await?;
                driver.create(desired, cancel).await
            }
            other => {
                tracing::info!(cluster = %prior.id, "cluster in sync, no changes needed");
                other
            }
        },
        Some(prior) => {
            if creation_only_changed(prior, desired) {
                tracing::warn!(
                    cluster = %prior.id,
                    "space and release cannot change after creation, ignoring"
                );
            }
            driver.update(&prior.id, desired, Some(prior), cancel).await
        }
    };

    match result {
        Ok(snapshot) => {
            store.flush(&snapshot).await?;
            Ok(snapshot)
        }
        Err(err) => {
            if let Some(partial) = err.partial_snapshot() {
                tracing::warn!(cluster = %partial.id, error = %err, "persisting partial snapshot");
                store.flush(partial).await?;
            }
            Err(err)
        }
    }
}

/// Delete the stored cluster, then forget it. Nothing stored is a no-op.
pub async fn destroy<A: ClusterApi, C: Clock>(
    store: &SnapshotStore,
    driver: &ReconciliationDriver<A, C>,
    cancel: CancelToken,
) -> Result<(), ProvisionerError> {
    let Some(prior) = store.load().await? else {
        tracing::info!("no stored cluster, nothing to destroy");
        return Ok(());
    };

    tracing::info!(cluster = %prior.id, "destroying cluster");
    driver.delete(&prior.id, cancel).await?;
    store.remove().await?;
    Ok(())
}

fn in_sync(prior: &ClusterSnapshot, desired: &ClusterDescriptor) -> bool {
    prior.name == desired.name
        && desired
            .plan
            .as_ref()
            .is_none_or(|plan| *plan == prior.plan.slug)
}

fn creation_only_changed(prior: &ClusterSnapshot, desired: &ClusterDescriptor) -> bool {
    let space_changed = desired
        .space
        .as_ref()
        .is_some_and(|space| *space != prior.space.path);
    let release_changed = desired
        .release
        .as_ref()
        .is_some_and(|release| *release != prior.release.slug);
    space_changed || release_changed
}
