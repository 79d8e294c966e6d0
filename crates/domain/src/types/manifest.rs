//! Dataset manifest types
//!
//! The metadata document exported at session end, summarizing the captured
//! dataset for downstream training pipelines. Field names serialize in
//! camelCase to match the established on-disk document format.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::CaptureRecord;

/// Top-level exported manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetManifest {
    pub project_info: ProjectInfo,
    pub classes: Vec<ClassSummary>,
    pub images: Vec<CaptureRecord>,
}

/// Project-level summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    /// Final component of the project folder.
    pub name: String,
    pub path: PathBuf,
    pub date_created: DateTime<Utc>,
    pub total_images: usize,
}

/// Per-label summary of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub name: String,
    pub count: usize,
    /// Label folder, with a trailing separator.
    pub path: String,
}
