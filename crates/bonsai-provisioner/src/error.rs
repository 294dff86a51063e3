use std::time::Duration;

use bonsai_core::models::{ClusterSnapshot, OperationKind};
use thiserror::Error;

/// Errors surfaced by a [`ClusterApi`](crate::api::ClusterApi) implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    /// The request referenced something that doesn't exist or isn't
    /// allowed (unknown plan, space or release). Never worth retrying.
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error("HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("{kind} {cluster}: invalid plan/space/release reference: {message}")]
    StructuralReference {
        kind: OperationKind,
        cluster: String,
        message: String,
    },

    #[error("update {cluster}: update request was not acknowledged: {message}")]
    AcceptanceRejected { cluster: String, message: String },

    #[error("{kind} {cluster}: timed out after {elapsed:?} awaiting convergence ({attempts} polls)")]
    ConvergenceTimeout {
        kind: OperationKind,
        cluster: String,
        elapsed: Duration,
        attempts: u32,
        partial: Option<Box<ClusterSnapshot>>,
    },

    #[error("{kind} {cluster}: cancelled after {elapsed:?}")]
    Cancelled {
        kind: OperationKind,
        cluster: String,
        elapsed: Duration,
        partial: Option<Box<ClusterSnapshot>>,
    },

    #[error("{kind} {cluster}: failed after {elapsed:?} while awaiting convergence: {reason}")]
    ConvergenceFailed {
        kind: OperationKind,
        cluster: String,
        elapsed: Duration,
        reason: String,
    },

    #[error("{kind} {cluster}: unexpected remote error: {message}")]
    UnexpectedRemote {
        kind: OperationKind,
        cluster: String,
        message: String,
    },

    #[error("cluster not found: {cluster}")]
    NotFound { cluster: String },

    #[error("{kind}: cluster identifier is missing")]
    MissingIdentifier { kind: OperationKind },

    #[error("config error: {0}")]
    Core(#[from] bonsai_core::error::CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProvisionerError {
    /// Classify an error from a mutating call or a single read.
    pub fn from_api(kind: OperationKind, cluster: &str, err: ApiError) -> Self {
        match err {
            ApiError::Validation { message } => Self::StructuralReference {
                kind,
                cluster: cluster.to_string(),
                message,
            },
            ApiError::NotFound => Self::NotFound {
                cluster: cluster.to_string(),
            },
            other => Self::UnexpectedRemote {
                kind,
                cluster: cluster.to_string(),
                message: format_err_chain(&other),
            },
        }
    }

    pub fn kind(&self) -> Option<OperationKind> {
        match self {
            Self::StructuralReference { kind, .. }
            | Self::ConvergenceTimeout { kind, .. }
            | Self::Cancelled { kind, .. }
            | Self::ConvergenceFailed { kind, .. }
            | Self::UnexpectedRemote { kind, .. }
            | Self::MissingIdentifier { kind } => Some(*kind),
            Self::AcceptanceRejected { .. } => Some(OperationKind::Update),
            Self::NotFound { .. } => Some(OperationKind::Read),
            _ => None,
        }
    }

    /// Timeouts and cancellations of create and update leave the cluster
    /// in an unknown but probably healthy state; running the operation
    /// again resumes it. A delete that timed out is a failure: the cluster
    /// was not confirmed gone. Everything else is structural or already
    /// reported by the remote.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConvergenceTimeout { kind, .. } => *kind != OperationKind::Delete,
            Self::Cancelled { .. } => true,
            _ => false,
        }
    }

    /// The best-known snapshot at the moment the operation gave up.
    pub fn partial_snapshot(&self) -> Option<&ClusterSnapshot> {
        match self {
            Self::ConvergenceTimeout { partial, .. } | Self::Cancelled { partial, .. } => {
                partial.as_deref()
            }
            _ => None,
        }
    }
}

/// Walk the full error chain and join all causes into one string.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
