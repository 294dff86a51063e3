use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::ClusterState;

/// A cluster as returned by a read against the control plane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub slug: String,
    pub name: String,
    pub uri: String,
    pub plan: PlanRef,
    pub release: ReleaseRef,
    pub space: SpaceRef,
    pub stats: ClusterStats,
    pub access: ClusterAccess,
    pub state: Option<ClusterState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRef {
    pub slug: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseRef {
    /// e.g. "elasticsearch", "opensearch"
    pub service_type: String,
    pub package_name: String,
    pub version: String,
    pub slug: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceRef {
    /// e.g. "omc/bonsai/us-east-1/common"
    pub path: String,
    pub region: String,
    pub uri: String,
}

/// Usage statistics. The platform refreshes these every 10-15 minutes,
/// so they are informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterStats {
    pub docs: i64,
    pub shards_used: i64,
    pub data_bytes_used: i64,
}

/// Connection details. `user`, `password` and `url` are only populated in
/// the creation response.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterAccess {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl fmt::Debug for ClusterAccess {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClusterAccess")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Response to a create request. The cluster record itself usually isn't
/// readable yet; `access` carries the one-time credentials.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterCreated {
    pub message: String,
    pub monitor: String,
    pub access: ClusterAccess,
}

impl ClusterCreated {
    /// The platform names the host after the cluster slug, and the create
    /// response carries no other identifier.
    pub fn slug(&self) -> Option<&str> {
        let host = self.access.host.trim();
        (!host.is_empty()).then_some(host)
    }
}

/// Free-text acknowledgement returned by update and destroy requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterMessage {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCreateOpts {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
}

/// Only name and plan can change after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterUpdateOpts {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}
