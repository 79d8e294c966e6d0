//! Port interfaces for session collaborators

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use datacam_domain::{DatasetManifest, GeoLocation, Result};

/// Trait for resolving the machine's current location
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Look up the current geolocated position
    async fn current_location(&self) -> Result<GeoLocation>;
}

/// Trait for persisting the exported dataset manifest
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Write the manifest to `path`; returns the path actually written
    async fn save_manifest(&self, manifest: &DatasetManifest, path: &Path) -> Result<PathBuf>;
}
