//! Batch capture scheduling
//!
//! The queue builder and the run controller driving a camera through a queue
//! of (resolution, count) capture jobs.

pub mod error;
pub mod ports;
pub mod queue;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{BatchCaptureScheduler, BatchTiming};
