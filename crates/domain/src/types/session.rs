//! Capture session types
//!
//! Records of captured images, the location metadata attached to them, and
//! the operator-facing session state (labels, project folder, scenario).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geolocated position attached to capture records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub country: String,
}

/// Manually entered position (building/floor/room) attached to capture
/// records when no geolocation is available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualLocation {
    /// Marker distinguishing manual entries in the serialized record format.
    #[serde(default = "manual_marker")]
    pub manual: bool,
    pub building: String,
    pub floor: String,
    pub room: String,
}

fn manual_marker() -> bool {
    true
}

impl ManualLocation {
    /// Manual location with the serialization marker set.
    pub fn new(building: impl Into<String>, floor: impl Into<String>, room: impl Into<String>) -> Self {
        Self { manual: true, building: building.into(), floor: floor.into(), room: room.into() }
    }
}

/// Location attached to a capture record: geolocated when available,
/// otherwise the operator-entered manual position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureLocation {
    Geo(GeoLocation),
    Manual(ManualLocation),
}

/// One successfully captured image.
///
/// Appended to the session's capture log by every successful capture, batch
/// or single-shot; the dataset manifest is built from these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// Millisecond epoch timestamp doubling as the record id.
    pub id: i64,
    pub label: String,
    pub filename: String,
    pub path: PathBuf,
    /// Actual resolution of the persisted frame, e.g. `"640x480"`.
    pub resolution: String,
    pub timestamp: DateTime<Utc>,
    /// Operator-described context of the capture session.
    pub scenario: String,
    pub location: Option<CaptureLocation>,
}

/// Resolved destination for captures, built by the session service once its
/// preconditions pass and handed to the capture sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureContext {
    pub project_dir: PathBuf,
    pub label: String,
    pub scenario: String,
    pub location: Option<CaptureLocation>,
}

/// Operator-facing session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub project_dir: Option<PathBuf>,
    pub labels: Vec<String>,
    pub current_label: Option<String>,
    pub scenario: String,
    pub manual_location: ManualLocation,
    pub geo_location: Option<GeoLocation>,
}

impl SessionState {
    /// Fresh session seeded with the given label catalog.
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            project_dir: None,
            labels: labels.into_iter().map(Into::into).collect(),
            current_label: None,
            scenario: String::new(),
            manual_location: ManualLocation::default(),
            geo_location: None,
        }
    }

    /// Location to stamp on new captures: geolocation when present, the
    /// manual entry when any of its fields is filled in, otherwise none.
    pub fn capture_location(&self) -> Option<CaptureLocation> {
        if let Some(geo) = &self.geo_location {
            return Some(CaptureLocation::Geo(geo.clone()));
        }
        let manual = &self.manual_location;
        if manual.building.is_empty() && manual.floor.is_empty() && manual.room.is_empty() {
            None
        } else {
            Some(CaptureLocation::Manual(ManualLocation::new(
                manual.building.clone(),
                manual.floor.clone(),
                manual.room.clone(),
            )))
        }
    }
}
