//! # Datacam Infrastructure
//!
//! Adapter layer implementing the core ports against real collaborators:
//! the webcam (nokhwa), the filesystem (JPEG capture sink and manifest
//! store), the network (IP geolocation), plus configuration loading,
//! tracing bootstrap, and application wiring.

pub mod bootstrap;
pub mod camera;
pub mod capture;
pub mod config;
pub mod location;
pub mod storage;
pub mod telemetry;

pub use bootstrap::AppContext;
pub use camera::NokhwaCameraController;
pub use capture::FsCaptureSink;
pub use location::{IpLocationProvider, StaticLocationProvider};
pub use storage::JsonManifestStore;
