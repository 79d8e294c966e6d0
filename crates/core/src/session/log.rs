//! Shared capture log
//!
//! Every successful capture, batch or single-shot, appends its record here;
//! the dataset manifest is built from these records at export time.

use std::sync::Arc;

use datacam_domain::CaptureRecord;
use parking_lot::RwLock;

/// In-memory log of captured images, shared between the session service and
/// the batch scheduler.
#[derive(Debug, Clone, Default)]
pub struct CaptureLog {
    records: Arc<RwLock<Vec<CaptureRecord>>>,
}

impl CaptureLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&self, record: CaptureRecord) {
        self.records.write().push(record);
    }

    /// Snapshot of all records in capture order.
    pub fn records(&self) -> Vec<CaptureRecord> {
        self.records.read().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the log holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Remove the record with the given id; returns whether one was removed.
    pub fn remove(&self, id: i64) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|record| record.id != id);
        records.len() != before
    }
}
