use serde::{Deserialize, Serialize};

use super::cluster::{ClusterCreateOpts, ClusterUpdateOpts};

/// The caller's desired configuration for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    pub name: String,
    /// Plan slug, e.g. "sandbox"
    #[serde(default)]
    pub plan: Option<String>,
    /// Space path, e.g. "omc/bonsai/us-east-1/common"
    #[serde(default)]
    pub space: Option<String>,
    /// Release slug, e.g. "opensearch-2.6.0-mt"
    #[serde(default)]
    pub release: Option<String>,
}

impl ClusterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }

    pub fn space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }

    pub fn release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn create_opts(&self) -> ClusterCreateOpts {
        ClusterCreateOpts {
            name: self.name.clone(),
            plan: self.plan.clone(),
            space: self.space.clone(),
            release: self.release.clone(),
        }
    }

    pub fn update_opts(&self) -> ClusterUpdateOpts {
        ClusterUpdateOpts {
            name: self.name.clone(),
            plan: self.plan.clone(),
        }
    }
}
