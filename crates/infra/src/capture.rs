//! Filesystem capture sink
//!
//! Grabs a frame from the active stream, encodes it as JPEG, and stores it
//! under `{project}/{label}/{label}_{W}x{H}_{date}.jpg`, creating the label
//! folder on demand.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use datacam_core::{CameraController, CameraFrame, CaptureSink};
use datacam_domain::{CaptureContext, CaptureRecord, DatacamError, Result};
use tracing::debug;

/// `CaptureSink` adapter persisting frames as JPEG files.
pub struct FsCaptureSink {
    camera: Arc<dyn CameraController>,
}

impl FsCaptureSink {
    /// Sink capturing from the given camera.
    pub fn new(camera: Arc<dyn CameraController>) -> Self {
        Self { camera }
    }
}

#[async_trait]
impl CaptureSink for FsCaptureSink {
    async fn capture_image(&self, ctx: &CaptureContext) -> Result<CaptureRecord> {
        let frame = self.camera.grab_frame().await?;

        let now = Utc::now();
        let date_stamp = now.format("%Y-%m-%dT%H-%M-%S");
        let filename = format!("{}_{}x{}_{}.jpg", ctx.label, frame.width, frame.height, date_stamp);
        let label_dir = ctx.project_dir.join(&ctx.label);
        let path = label_dir.join(&filename);

        let jpeg = encode_jpeg(&frame)?;

        tokio::fs::create_dir_all(&label_dir)
            .await
            .map_err(|err| DatacamError::Storage(format!("creating label folder failed: {err}")))?;
        tokio::fs::write(&path, &jpeg)
            .await
            .map_err(|err| DatacamError::Storage(format!("writing image failed: {err}")))?;

        debug!(path = %path.display(), bytes = jpeg.len(), "image persisted");

        Ok(CaptureRecord {
            id: now.timestamp_millis(),
            label: ctx.label.clone(),
            filename,
            path,
            resolution: format!("{}x{}", frame.width, frame.height),
            timestamp: now,
            scenario: ctx.scenario.clone(),
            location: ctx.location.clone(),
        })
    }
}

fn encode_jpeg(frame: &CameraFrame) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .ok_or_else(|| {
            DatacamError::Capture("frame buffer does not match its dimensions".into())
        })?;

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .map_err(|err| DatacamError::Capture(format!("JPEG encode failed: {err}")))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    struct SolidColorCamera {
        active: AtomicBool,
    }

    impl SolidColorCamera {
        fn started() -> Arc<Self> {
            Arc::new(Self { active: AtomicBool::new(true) })
        }
    }

    #[async_trait]
    impl CameraController for SolidColorCamera {
        async fn start_camera(&self, _width: u32, _height: u32) -> Result<()> {
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop_camera(&self) -> Result<()> {
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn grab_frame(&self) -> Result<CameraFrame> {
            // 4x2 solid orange frame.
            let pixels = std::iter::repeat([255u8, 128, 0]).take(8).flatten().collect();
            Ok(CameraFrame { width: 4, height: 2, pixels })
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    fn ctx(project_dir: PathBuf) -> CaptureContext {
        CaptureContext {
            project_dir,
            label: "dog".into(),
            scenario: "dock".into(),
            location: None,
        }
    }

    #[tokio::test]
    async fn capture_writes_a_decodable_jpeg_under_the_label_folder() {
        let dir = tempfile::tempdir().expect("temp dir");
        let sink = FsCaptureSink::new(SolidColorCamera::started());

        let record = sink
            .capture_image(&ctx(dir.path().to_path_buf()))
            .await
            .expect("capture succeeds");

        assert!(record.path.starts_with(dir.path().join("dog")));
        assert!(record.filename.starts_with("dog_4x2_"));
        assert!(record.filename.ends_with(".jpg"));
        assert_eq!(record.resolution, "4x2");
        assert_eq!(record.scenario, "dock");

        let bytes = std::fs::read(&record.path).expect("image on disk");
        let decoded = image::load_from_memory(&bytes).expect("valid JPEG");
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
    }

    #[tokio::test]
    async fn mismatched_frame_buffer_is_rejected() {
        let frame = CameraFrame { width: 10, height: 10, pixels: vec![0; 3] };
        assert!(matches!(
            encode_jpeg(&frame),
            Err(DatacamError::Capture(_))
        ));
    }
}
