//! # Datacam Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The batch capture scheduler and its queue builder
//! - Port/adapter interfaces (traits)
//! - The capture session service
//!
//! ## Architecture Principles
//! - Only depends on `datacam-domain`
//! - No camera, filesystem, or network code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod batch;
pub mod session;

// Re-export specific items to avoid ambiguity
pub use batch::ports::{BatchEvents, CameraController, CameraFrame, CaptureSink, NoopBatchEvents};
pub use batch::queue::build_queue;
pub use batch::{BatchCaptureScheduler, BatchTiming, SchedulerError, SchedulerResult};
pub use session::log::CaptureLog;
pub use session::ports::{LocationProvider, ManifestStore};
pub use session::SessionService;
