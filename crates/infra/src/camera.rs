//! Webcam control via nokhwa
//!
//! One `Camera` handle guarded by a mutex; reconfiguration closes the active
//! stream before opening a new one, so a single stream exists at a time.
//! nokhwa's calls block, so they run on the blocking thread pool.

use std::sync::Arc;

use async_trait::async_trait;
use datacam_core::{CameraController, CameraFrame};
use datacam_domain::{CameraConfig, DatacamError, Result};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Human-readable names of the attached capture devices.
///
/// # Errors
/// Returns `Camera` when device enumeration fails.
pub fn list_devices() -> Result<Vec<String>> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|err| DatacamError::Camera(format!("device enumeration failed: {err}")))?;
    Ok(cameras.iter().map(|camera| camera.human_name()).collect())
}

/// `CameraController` adapter over a nokhwa capture device.
pub struct NokhwaCameraController {
    device_index: u32,
    frame_rate: u32,
    camera: Arc<Mutex<Option<Camera>>>,
}

impl NokhwaCameraController {
    /// Controller for the configured capture device. No stream is opened
    /// until the first `start_camera` call.
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            device_index: config.device_index,
            frame_rate: config.frame_rate,
            camera: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl CameraController for NokhwaCameraController {
    async fn start_camera(&self, width: u32, height: u32) -> Result<()> {
        let camera = Arc::clone(&self.camera);
        let device_index = self.device_index;
        let frame_rate = self.frame_rate;

        tokio::task::spawn_blocking(move || {
            let mut guard = camera.lock();

            // Close any existing stream before reconfiguring.
            if let Some(mut active) = guard.take() {
                if let Err(err) = active.stop_stream() {
                    debug!(error = %err, "closing previous stream failed");
                }
            }

            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(Resolution::new(width, height), FrameFormat::MJPEG, frame_rate),
            ));
            let mut opened = Camera::new(CameraIndex::Index(device_index), requested)
                .map_err(|err| DatacamError::Camera(format!("opening device failed: {err}")))?;
            opened
                .open_stream()
                .map_err(|err| DatacamError::Camera(format!("opening stream failed: {err}")))?;

            info!(width, height, format = ?opened.camera_format(), "camera stream started");
            *guard = Some(opened);
            Ok(())
        })
        .await
        .map_err(|err| DatacamError::Internal(format!("camera task join failed: {err}")))?
    }

    async fn stop_camera(&self) -> Result<()> {
        let camera = Arc::clone(&self.camera);

        tokio::task::spawn_blocking(move || {
            if let Some(mut active) = camera.lock().take() {
                active
                    .stop_stream()
                    .map_err(|err| DatacamError::Camera(format!("closing stream failed: {err}")))?;
                info!("camera stream stopped");
            }
            Ok(())
        })
        .await
        .map_err(|err| DatacamError::Internal(format!("camera task join failed: {err}")))?
    }

    async fn grab_frame(&self) -> Result<CameraFrame> {
        let camera = Arc::clone(&self.camera);

        tokio::task::spawn_blocking(move || {
            let mut guard = camera.lock();
            let active = guard
                .as_mut()
                .ok_or_else(|| DatacamError::Camera("no active stream".into()))?;

            let frame = active
                .frame()
                .map_err(|err| DatacamError::Camera(format!("frame grab failed: {err}")))?;
            let decoded = frame
                .decode_image::<RgbFormat>()
                .map_err(|err| DatacamError::Capture(format!("frame decode failed: {err}")))?;

            Ok(CameraFrame {
                width: decoded.width(),
                height: decoded.height(),
                pixels: decoded.into_raw(),
            })
        })
        .await
        .map_err(|err| DatacamError::Internal(format!("camera task join failed: {err}")))?
    }

    fn is_active(&self) -> bool {
        self.camera.lock().is_some()
    }
}
