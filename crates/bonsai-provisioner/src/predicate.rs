//! Classifies each poll result as ready, still converging, or failed.
//!
//! The control plane has no single "done" flag: a fresh cluster reports
//! its space as "not available" until placement finishes, and an update is
//! only visible once the state leaves `updating_plan` and the new name is
//! echoed back. Each operation kind gets its own predicate so the text
//! matching stays out of the driver.

use bonsai_core::models::{Cluster, ClusterDescriptor, OperationKind};

use crate::error::{format_err_chain, ApiError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    Ready,
    InProgress,
    Failed(String),
    /// The cluster is gone. Terminal success for deletes only.
    NotFound,
}

impl Convergence {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

pub trait ConvergencePredicate: Send + Sync {
    fn classify(&self, observed: &Result<Cluster, ApiError>) -> Convergence;
}

/// Substrings the platform puts in text fields it hasn't resolved yet.
#[derive(Debug, Clone)]
pub struct UnavailableMarkers {
    needles: Vec<String>,
}

impl Default for UnavailableMarkers {
    fn default() -> Self {
        Self::new(["not available"])
    }
}

impl UnavailableMarkers {
    pub fn new<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needles: needles
                .into_iter()
                .map(|n| n.into().to_lowercase())
                .collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.needles.iter().any(|n| text.contains(n.as_str()))
    }

    /// Space path or URI still carries a placeholder.
    pub fn space_unresolved(&self, cluster: &Cluster) -> bool {
        self.matches(&cluster.space.path) || self.matches(&cluster.space.uri)
    }
}

/// Phrase an update response must contain for the request to count as
/// accepted.
#[derive(Debug, Clone)]
pub struct AcceptanceMarker {
    phrase: String,
}

impl Default for AcceptanceMarker {
    fn default() -> Self {
        Self::new("Your cluster is being updated")
    }
}

impl AcceptanceMarker {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
        }
    }

    pub fn accepts(&self, message: &str) -> bool {
        message.contains(self.phrase.as_str())
    }
}

/// A new cluster is ready once it can be read, placement has resolved and
/// it has left the transitional states.
#[derive(Debug, Clone, Default)]
pub struct CreateConvergence {
    markers: UnavailableMarkers,
}

impl CreateConvergence {
    pub fn new(markers: UnavailableMarkers) -> Self {
        Self { markers }
    }
}

impl ConvergencePredicate for CreateConvergence {
    fn classify(&self, observed: &Result<Cluster, ApiError>) -> Convergence {
        match observed {
            // Not visible yet
            Err(ApiError::NotFound) => Convergence::InProgress,
            Err(err) => Convergence::Failed(format_err_chain(err)),
            Ok(cluster) if self.markers.space_unresolved(cluster) => Convergence::InProgress,
            Ok(cluster) if !settled(cluster, OperationKind::Create) => Convergence::InProgress,
            Ok(_) => Convergence::Ready,
        }
    }
}

/// An update is ready only when the plan change has finished AND the new
/// name is visible; either one alone can land first.
#[derive(Debug, Clone)]
pub struct UpdateConvergence {
    desired_name: String,
    markers: UnavailableMarkers,
}

impl UpdateConvergence {
    pub fn new(desired_name: impl Into<String>, markers: UnavailableMarkers) -> Self {
        Self {
            desired_name: desired_name.into(),
            markers,
        }
    }
}

impl ConvergencePredicate for UpdateConvergence {
    fn classify(&self, observed: &Result<Cluster, ApiError>) -> Convergence {
        match observed {
            Err(ApiError::NotFound) => Convergence::InProgress,
            Err(err) => Convergence::Failed(format_err_chain(err)),
            Ok(cluster) if self.markers.space_unresolved(cluster) => Convergence::InProgress,
            Ok(cluster)
                if settled(cluster, OperationKind::Update) && cluster.name == self.desired_name =>
            {
                Convergence::Ready
            }
            Ok(_) => Convergence::InProgress,
        }
    }
}

/// Deletion is confirmed by a not-found read, or by a record that still
/// exists but reports `deprovisioned`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteConvergence;

impl ConvergencePredicate for DeleteConvergence {
    fn classify(&self, observed: &Result<Cluster, ApiError>) -> Convergence {
        match observed {
            Err(ApiError::NotFound) => Convergence::NotFound,
            Err(err) => Convergence::Failed(format_err_chain(err)),
            Ok(cluster)
                if cluster
                    .state
                    .as_ref()
                    .is_some_and(|state| state.is_terminal_for(OperationKind::Delete)) =>
            {
                Convergence::Ready
            }
            Ok(_) => Convergence::InProgress,
        }
    }
}

/// A single read: whatever comes back is final.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadConvergence;

impl ConvergencePredicate for ReadConvergence {
    fn classify(&self, observed: &Result<Cluster, ApiError>) -> Convergence {
        match observed {
            Ok(_) => Convergence::Ready,
            Err(ApiError::NotFound) => Convergence::NotFound,
            Err(err) => Convergence::Failed(format_err_chain(err)),
        }
    }
}

/// A cluster that reports no state at all is taken as settled.
fn settled(cluster: &Cluster, kind: OperationKind) -> bool {
    cluster
        .state
        .as_ref()
        .is_none_or(|state| state.is_terminal_for(kind))
}

/// Classify one poll result for `kind` with the default markers.
pub fn classify(
    kind: OperationKind,
    desired: &ClusterDescriptor,
    observed: &Result<Cluster, ApiError>,
) -> Convergence {
    match kind {
        OperationKind::Create => CreateConvergence::default().classify(observed),
        OperationKind::Update => {
            UpdateConvergence::new(desired.name.clone(), UnavailableMarkers::default())
                .classify(observed)
        }
        OperationKind::Delete => DeleteConvergence.classify(observed),
        OperationKind::Read => ReadConvergence.classify(observed),
    }
}
