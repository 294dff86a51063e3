use std::fmt;

use serde::{Deserialize, Serialize};

use super::cluster::{
    Cluster, ClusterAccess, ClusterCreated, ClusterStats, PlanRef, ReleaseRef, SpaceRef,
};
use super::state::ClusterState;

/// Last known remote truth for a cluster, in the shape the caller persists.
///
/// `id` is assigned once from the creation response and is the join key
/// for every later read. The credentials inside `access` are only ever
/// seen at creation and must be carried forward by whoever refreshes the
/// snapshot (see the provisioner's merge rules).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSnapshot {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub uri: String,
    /// Message received during creation
    pub message: String,
    /// Monitor URL received during creation
    pub monitor: String,
    pub plan: PlanRef,
    pub release: ReleaseRef,
    pub space: SpaceRef,
    pub stats: Option<ClusterStats>,
    pub access: ClusterAccess,
    pub state: Option<ClusterState>,
    pub observed_at: Option<jiff::Timestamp>,
}

impl ClusterSnapshot {
    /// Seed a snapshot from the creation response: identifier, creation
    /// message/monitor and the one-time credentials. Everything else is
    /// filled in by later reads.
    pub fn from_created(created: &ClusterCreated) -> Self {
        let slug = created.slug().unwrap_or_default().to_string();
        Self {
            id: slug.clone(),
            slug,
            message: created.message.clone(),
            monitor: created.monitor.clone(),
            access: created.access.clone(),
            ..Self::default()
        }
    }

    /// Build a snapshot from a read. Reads never return credentials, so
    /// `access.user`/`access.password` are whatever the platform sent
    /// (normally nothing).
    pub fn from_cluster(cluster: &Cluster, observed_at: jiff::Timestamp) -> Self {
        Self {
            id: cluster.slug.clone(),
            slug: cluster.slug.clone(),
            name: cluster.name.clone(),
            uri: cluster.uri.clone(),
            message: String::new(),
            monitor: String::new(),
            plan: cluster.plan.clone(),
            release: cluster.release.clone(),
            space: cluster.space.clone(),
            stats: Some(cluster.stats),
            access: cluster.access.clone(),
            state: cluster.state.clone(),
            observed_at: Some(observed_at),
        }
    }

    pub fn has_identifier(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// The one-time credentials, if this snapshot holds a usable pair.
    pub fn credentials(&self) -> Option<Credentials> {
        let user = non_blank(self.access.user.as_deref())?;
        let password = non_blank(self.access.password.as_deref())?;
        Some(Credentials {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
