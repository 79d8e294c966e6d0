//! Application configuration structures
//!
//! Typed configuration consumed across the workspace. Values are populated by
//! the infrastructure loader (environment variables with file fallback); the
//! defaults here mirror the behavior of a freshly installed instance.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_INTER_CAPTURE_DELAY_MS, DEFAULT_LABELS, DEFAULT_MANIFEST_FILENAME,
    DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_STABILIZATION_DELAY_MS,
};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Camera device settings
    #[serde(default)]
    pub camera: CameraConfig,
    /// Batch capture timing and resilience settings
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Session defaults
    #[serde(default)]
    pub session: SessionConfig,
}

/// Camera device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CameraConfig {
    /// Index of the capture device to open
    pub device_index: u32,
    /// Frames per second requested when opening a stream
    pub frame_rate: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { device_index: 0, frame_rate: 30 }
    }
}

/// Batch capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    /// Milliseconds to wait after a camera reconfiguration before capturing
    pub stabilization_delay_ms: u64,
    /// Default milliseconds between successive captures
    pub inter_capture_delay_ms: u64,
    /// Consecutive skipped items after which a run is aborted
    pub max_consecutive_failures: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            stabilization_delay_ms: DEFAULT_STABILIZATION_DELAY_MS,
            inter_capture_delay_ms: DEFAULT_INTER_CAPTURE_DELAY_MS,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Labels seeded into a fresh session
    pub default_labels: Vec<String>,
    /// Filename of the exported dataset manifest, relative to the project
    /// folder
    pub manifest_filename: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_labels: DEFAULT_LABELS.iter().map(ToString::to_string).collect(),
            manifest_filename: DEFAULT_MANIFEST_FILENAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fresh_install() {
        let config = Config::default();
        assert_eq!(config.camera.device_index, 0);
        assert_eq!(config.capture.stabilization_delay_ms, 1000);
        assert_eq!(config.capture.inter_capture_delay_ms, 2000);
        assert_eq!(config.capture.max_consecutive_failures, 25);
        assert_eq!(config.session.default_labels.len(), 4);
        assert_eq!(config.session.manifest_filename, "tensorflow_metadata.json");
    }

    #[test]
    fn partial_toml_fills_missing_sections_with_defaults() {
        let parsed: Config = toml::from_str("[capture]\nstabilization_delay_ms = 250\ninter_capture_delay_ms = 500\nmax_consecutive_failures = 3\n")
            .unwrap();
        assert_eq!(parsed.capture.stabilization_delay_ms, 250);
        assert_eq!(parsed.camera, CameraConfig::default());
    }
}
