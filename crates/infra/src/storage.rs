//! Dataset manifest persistence

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use datacam_core::ManifestStore;
use datacam_domain::{DatacamError, DatasetManifest, Result};
use tracing::debug;

/// `ManifestStore` adapter writing pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManifestStore;

#[async_trait]
impl ManifestStore for JsonManifestStore {
    async fn save_manifest(&self, manifest: &DatasetManifest, path: &Path) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|err| DatacamError::Internal(format!("serializing manifest failed: {err}")))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                DatacamError::Storage(format!("creating manifest folder failed: {err}"))
            })?;
        }
        tokio::fs::write(path, json)
            .await
            .map_err(|err| DatacamError::Storage(format!("writing manifest failed: {err}")))?;

        debug!(path = %path.display(), "manifest written");
        Ok(path.to_path_buf())
    }
}
