//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

use crate::types::batch::ResolutionPreset;

/// Labels a fresh session starts with.
pub const DEFAULT_LABELS: [&str; 4] = ["dog", "cat", "car", "person"];

/// Wait after reconfiguring the camera before capturing, letting
/// auto-exposure and focus settle.
pub const DEFAULT_STABILIZATION_DELAY_MS: u64 = 1000;

/// Wait between the end of one successful capture and the start of the next
/// item.
pub const DEFAULT_INTER_CAPTURE_DELAY_MS: u64 = 2000;

/// Consecutive skipped items after which a batch run is aborted.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 25;

/// Default filename for the exported dataset manifest, relative to the
/// project folder.
pub const DEFAULT_MANIFEST_FILENAME: &str = "tensorflow_metadata.json";

/// OV2640 and common capture resolutions offered for batch runs.
pub const RESOLUTION_PRESETS: [ResolutionPreset; 9] = [
    ResolutionPreset { width: 160, height: 120, name: "QQVGA (160x120)" },
    ResolutionPreset { width: 320, height: 240, name: "QVGA (320x240)" },
    ResolutionPreset { width: 640, height: 480, name: "VGA (640x480)" },
    ResolutionPreset { width: 800, height: 600, name: "SVGA (800x600)" },
    ResolutionPreset { width: 1024, height: 768, name: "XGA (1024x768)" },
    ResolutionPreset { width: 1280, height: 720, name: "HD (1280x720)" },
    ResolutionPreset { width: 1280, height: 1024, name: "SXGA (1280x1024)" },
    ResolutionPreset { width: 1600, height: 1200, name: "UXGA (1600x1200)" },
    ResolutionPreset { width: 1920, height: 1080, name: "FHD (1920x1080)" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_distinct_and_named_consistently() {
        for (index, preset) in RESOLUTION_PRESETS.iter().enumerate() {
            assert!(preset.width > 0 && preset.height > 0);
            assert!(preset.name.contains(&format!("{}x{}", preset.width, preset.height)));
            assert!(RESOLUTION_PRESETS[index + 1..]
                .iter()
                .all(|other| (other.width, other.height) != (preset.width, preset.height)));
        }
    }
}

