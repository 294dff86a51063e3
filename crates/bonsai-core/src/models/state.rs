use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the control plane for a cluster.
///
/// Values the build doesn't know deserialize to [`ClusterState::Unknown`]
/// instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClusterState {
    Provisioning,
    Provisioned,
    UpdatingPlan,
    Deprovisioning,
    Deprovisioned,
    ReadOnly,
    Maintenance,
    Disabled,
    Unknown(String),
}

impl ClusterState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "provisioning",
            Self::Provisioned => "provisioned",
            Self::UpdatingPlan => "updating_plan",
            Self::Deprovisioning => "deprovisioning",
            Self::Deprovisioned => "deprovisioned",
            Self::ReadOnly => "read_only",
            Self::Maintenance => "maintenance",
            Self::Disabled => "disabled",
            Self::Unknown(raw) => raw,
        }
    }

    /// The cluster is moving between states and a poll should keep waiting.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            Self::Provisioning | Self::UpdatingPlan | Self::Deprovisioning
        )
    }

    /// Whether this state ends polling for `kind`, judged on the state
    /// alone. Predicates add their own field checks on top.
    pub fn is_terminal_for(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Create => !self.is_transitional(),
            OperationKind::Update => *self != Self::UpdatingPlan,
            OperationKind::Delete => *self == Self::Deprovisioned,
            OperationKind::Read => true,
        }
    }
}

impl From<String> for ClusterState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "provisioning" => Self::Provisioning,
            "provisioned" => Self::Provisioned,
            "updating_plan" => Self::UpdatingPlan,
            "deprovisioning" => Self::Deprovisioning,
            "deprovisioned" => Self::Deprovisioned,
            "read_only" => Self::ReadOnly,
            "maintenance" => Self::Maintenance,
            "disabled" => Self::Disabled,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for ClusterState {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<ClusterState> for String {
    fn from(state: ClusterState) -> Self {
        match state {
            ClusterState::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which reconciliation flow is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    Read,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Read => "read",
        })
    }
}
