//! Batch capture types
//!
//! The queue model for a batch run: operator-requested specs, their expansion
//! into individual job items, and the mutable run state the scheduler owns
//! while driving a run to a terminal status.

use serde::{Deserialize, Serialize};

/// A capture resolution offered to the operator, with its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionPreset {
    pub width: u32,
    pub height: u32,
    pub name: &'static str,
}

/// Operator-requested work before expansion: capture `count` images at
/// `width`x`height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureJobSpec {
    pub width: u32,
    pub height: u32,
    pub count: u32,
}

/// One individual scheduled capture unit after expansion.
///
/// `sequence_index` is 1-based within the item's resolution group;
/// `group_total` is the size of that group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureJobItem {
    pub width: u32,
    pub height: u32,
    pub sequence_index: u32,
    pub group_total: u32,
}

impl CaptureJobItem {
    /// Display form of the item's resolution, e.g. `"640x480"`.
    pub fn resolution_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// An ordered sequence of job items, built once per run start and immutable
/// afterwards; only a cursor advances over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchQueue {
    items: Vec<CaptureJobItem>,
}

impl BatchQueue {
    /// Wrap an expanded (and optionally shuffled) item list.
    pub fn new(items: Vec<CaptureJobItem>) -> Self {
        Self { items }
    }

    /// Number of items in the queue.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&CaptureJobItem> {
        self.items.get(index)
    }

    /// All items in queue order.
    pub fn items(&self) -> &[CaptureJobItem] {
        &self.items
    }
}

/// Lifecycle status of a batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Idle,
    Running,
    Paused,
    Completed,
    Stopped,
}

impl BatchStatus {
    /// Canonical lowercase form, used in progress displays and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }

    /// Whether a run is in progress (running or paused).
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Whether the run has reached a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "stopped" => Ok(Self::Stopped),
            other => Err(format!("unknown batch status: {other}")),
        }
    }
}

/// Mutable state of one batch run.
///
/// Owned exclusively by the scheduler for the duration of the run. `cursor`
/// is the 0-based next-item pointer and only ever increases;
/// `completed_count <= cursor <= queue.len()` holds at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunState {
    pub queue: BatchQueue,
    pub cursor: usize,
    pub completed_count: usize,
    pub status: BatchStatus,
    pub current_item: Option<CaptureJobItem>,
}

impl BatchRunState {
    /// State before any run has been requested.
    pub fn idle() -> Self {
        Self {
            queue: BatchQueue::default(),
            cursor: 0,
            completed_count: 0,
            status: BatchStatus::Idle,
            current_item: None,
        }
    }

    /// Fresh state for a newly built queue, ready to run.
    pub fn start(queue: BatchQueue) -> Self {
        Self { queue, cursor: 0, completed_count: 0, status: BatchStatus::Running, current_item: None }
    }

    /// The item the cursor points at, if the queue is not exhausted.
    pub fn next_item(&self) -> Option<CaptureJobItem> {
        self.queue.get(self.cursor).copied()
    }

    /// Whether the cursor has moved past the last item.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.queue.len()
    }

    /// Advance past an item that was skipped due to a failure.
    pub fn advance_skipped(&mut self) {
        self.cursor += 1;
    }

    /// Advance past an item that was captured successfully.
    pub fn advance_captured(&mut self) {
        self.completed_count += 1;
        self.cursor += 1;
    }

    /// Read-only projection of this state for the UI layer.
    ///
    /// Percent reflects items *started* (cursor over queue length), matching
    /// the observable progress semantics of the batch UI; a completed run
    /// reports 100 even when items were skipped.
    pub fn progress(&self) -> BatchProgress {
        let total_items = self.queue.len();
        let percent = if self.status == BatchStatus::Completed {
            100.0
        } else if total_items == 0 {
            0.0
        } else {
            self.cursor as f64 / total_items as f64 * 100.0
        };

        let (current_resolution, current_index, total_for_resolution) = self
            .current_item
            .as_ref()
            .map_or((String::new(), 0, 0), |item| {
                (item.resolution_label(), item.sequence_index, item.group_total)
            });

        BatchProgress {
            status: self.status,
            percent,
            current_resolution,
            current_index,
            total_for_resolution,
            completed_count: self.completed_count,
            total_items,
        }
    }
}

/// Read-only snapshot of a run's progress, recomputed after every state
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub status: BatchStatus,
    /// Percentage of items started, in `[0, 100]`.
    pub percent: f64,
    /// Resolution of the item being processed, e.g. `"640x480"`; empty when
    /// no item is in flight.
    pub current_resolution: String,
    /// 1-based index of the current item within its resolution group.
    pub current_index: u32,
    /// Size of the current item's resolution group.
    pub total_for_resolution: u32,
    pub completed_count: usize,
    pub total_items: usize,
}

impl BatchProgress {
    /// Snapshot for a scheduler with no run state.
    pub fn idle() -> Self {
        BatchRunState::idle().progress()
    }
}
