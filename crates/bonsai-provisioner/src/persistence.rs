use std::path::PathBuf;

use bonsai_core::models::ClusterSnapshot;

use crate::error::ProvisionerError;

/// Local JSON state file holding the last persisted snapshot of one
/// cluster.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    pub local_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
        }
    }

    /// Write the snapshot atomically: tmp + rename.
    pub async fn flush(&self, snapshot: &ClusterSnapshot) -> Result<(), ProvisionerError> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.local_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)?;
        std::fs::rename(&tmp_path, &self.local_path)?;

        tracing::debug!(path = %self.local_path.display(), cluster = %snapshot.id, "snapshot flushed");
        Ok(())
    }

    /// Load the stored snapshot. `None` if nothing has been written yet.
    pub async fn load(&self) -> Result<Option<ClusterSnapshot>, ProvisionerError> {
        if !self.local_path.exists() {
            tracing::debug!(path = %self.local_path.display(), "no stored snapshot");
            return Ok(None);
        }
        let json = std::fs::read(&self.local_path)?;
        let snapshot: ClusterSnapshot = serde_json::from_slice(&json)?;
        tracing::debug!(path = %self.local_path.display(), cluster = %snapshot.id, "snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Forget the stored snapshot. Missing file is fine.
    pub async fn remove(&self) -> Result<(), ProvisionerError> {
        match std::fs::remove_file(&self.local_path) {
            Ok(()) => {
                tracing::debug!(path = %self.local_path.display(), "snapshot removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
