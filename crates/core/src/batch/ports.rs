//! Port interfaces for batch capture
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use async_trait::async_trait;
use datacam_domain::{CaptureContext, CaptureRecord, Result};

/// A raw frame grabbed from the active camera stream, in packed RGB8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Trait for controlling the capture device
///
/// One stream is active at a time; starting the camera at a new resolution
/// reconfigures (closes and reopens) the active stream.
#[async_trait]
pub trait CameraController: Send + Sync {
    /// Open or reconfigure the capture stream at the requested resolution
    async fn start_camera(&self, width: u32, height: u32) -> Result<()>;

    /// Close the active capture stream, if any
    async fn stop_camera(&self) -> Result<()>;

    /// Grab one frame from the active stream
    async fn grab_frame(&self) -> Result<CameraFrame>;

    /// Whether a stream is currently open
    fn is_active(&self) -> bool;
}

/// Trait for persisting one frame from the active stream
#[async_trait]
pub trait CaptureSink: Send + Sync {
    /// Grab the current frame, encode it, and persist it under the
    /// label-derived path described by `ctx`; returns the record of the
    /// stored image
    async fn capture_image(&self, ctx: &CaptureContext) -> Result<CaptureRecord>;
}

/// Terminal notifications emitted when a batch run ends
#[async_trait]
pub trait BatchEvents: Send + Sync {
    /// The run processed its whole queue
    async fn on_completed(&self, captured: usize) {
        let _ = captured;
    }

    /// The run was stopped before exhausting its queue
    async fn on_stopped(&self, captured: usize) {
        let _ = captured;
    }
}

/// Event sink that ignores all notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBatchEvents;

#[async_trait]
impl BatchEvents for NoopBatchEvents {}
