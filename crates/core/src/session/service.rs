//! Capture session service - core business logic
//!
//! Owns the operator-facing session state and the single-shot capture path,
//! validates preconditions, and delegates batch control to the scheduler.
//! The single-shot path and camera toggling are refused while a batch run is
//! active; the run controller owns the stream for the whole run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use datacam_domain::{
    CaptureContext, CaptureJobSpec, CaptureRecord, ClassSummary, DatacamError, DatasetManifest,
    GeoLocation, ManualLocation, ProjectInfo, Result, SessionConfig, SessionState,
};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::batch::ports::{CameraController, CaptureSink};
use crate::batch::BatchCaptureScheduler;

use super::log::CaptureLog;
use super::ports::{LocationProvider, ManifestStore};

/// Capture session service
pub struct SessionService {
    camera: Arc<dyn CameraController>,
    sink: Arc<dyn CaptureSink>,
    location: Arc<dyn LocationProvider>,
    manifests: Arc<dyn ManifestStore>,
    scheduler: Arc<BatchCaptureScheduler>,
    log: CaptureLog,
    state: Mutex<SessionState>,
    manifest_filename: String,
}

impl SessionService {
    /// Create a session seeded with the configured default labels.
    pub fn new(
        camera: Arc<dyn CameraController>,
        sink: Arc<dyn CaptureSink>,
        location: Arc<dyn LocationProvider>,
        manifests: Arc<dyn ManifestStore>,
        scheduler: Arc<BatchCaptureScheduler>,
        log: CaptureLog,
        config: &SessionConfig,
    ) -> Self {
        Self {
            camera,
            sink,
            location,
            manifests,
            scheduler,
            log,
            state: Mutex::new(SessionState::with_labels(config.default_labels.clone())),
            manifest_filename: config.manifest_filename.clone(),
        }
    }

    /// The batch scheduler owning run control.
    pub fn scheduler(&self) -> &BatchCaptureScheduler {
        &self.scheduler
    }

    /// Snapshot of the session state.
    pub fn session_state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Label catalog in insertion order.
    pub fn labels(&self) -> Vec<String> {
        self.state.lock().labels.clone()
    }

    /// Currently selected label, if any.
    pub fn current_label(&self) -> Option<String> {
        self.state.lock().current_label.clone()
    }

    /// Add a label to the catalog and select it.
    ///
    /// Adding an existing label selects it instead of duplicating the
    /// catalog entry.
    ///
    /// # Errors
    /// `InvalidInput` when the trimmed label is empty.
    pub fn add_label(&self, label: &str) -> Result<String> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DatacamError::InvalidInput("label cannot be empty".into()));
        }

        let mut state = self.state.lock();
        if !state.labels.iter().any(|existing| existing == label) {
            state.labels.push(label.to_string());
            info!(label, "added new label");
        }
        state.current_label = Some(label.to_string());
        Ok(label.to_string())
    }

    /// Select an existing label for subsequent captures.
    ///
    /// # Errors
    /// `NotFound` when the label is not in the catalog.
    pub fn select_label(&self, label: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.labels.iter().any(|existing| existing == label) {
            state.current_label = Some(label.to_string());
            Ok(())
        } else {
            Err(DatacamError::NotFound(format!("label {label} is not in the catalog")))
        }
    }

    /// Set the project folder captures are stored under.
    pub fn set_project_dir(&self, path: PathBuf) {
        info!(path = %path.display(), "project folder set");
        self.state.lock().project_dir = Some(path);
    }

    /// Set the free-form scenario description stamped on new captures.
    pub fn set_scenario(&self, scenario: &str) {
        self.state.lock().scenario = scenario.to_string();
    }

    /// Set the manually entered location stamped on new captures when no
    /// geolocation is available.
    pub fn set_manual_location(&self, location: ManualLocation) {
        self.state.lock().manual_location = location;
    }

    /// Refresh the geolocated position from the location provider.
    ///
    /// # Errors
    /// Propagates the provider failure; the previously known position is
    /// kept.
    pub async fn refresh_location(&self) -> Result<GeoLocation> {
        match self.location.current_location().await {
            Ok(geo) => {
                self.state.lock().geo_location = Some(geo.clone());
                Ok(geo)
            }
            Err(err) => {
                warn!(error = %err, "location lookup failed");
                Err(err)
            }
        }
    }

    /// Open or reconfigure the camera stream for interactive use.
    ///
    /// # Errors
    /// Refused while a batch run is active; propagates camera failures.
    pub async fn start_camera(&self, width: u32, height: u32) -> Result<()> {
        self.ensure_no_active_batch()?;
        self.camera.start_camera(width, height).await
    }

    /// Close the camera stream.
    ///
    /// # Errors
    /// Refused while a batch run is active; propagates camera failures.
    pub async fn stop_camera(&self) -> Result<()> {
        self.ensure_no_active_batch()?;
        self.camera.stop_camera().await
    }

    /// Capture a single image outside a batch run.
    ///
    /// # Errors
    /// Refused while a batch run is active, while no stream is open, or
    /// while no label/project folder is selected.
    #[instrument(skip(self))]
    pub async fn capture_single(&self) -> Result<CaptureRecord> {
        self.ensure_no_active_batch()?;
        if !self.camera.is_active() {
            return Err(DatacamError::Camera("camera is not active".into()));
        }

        let ctx = self.capture_context()?;
        let record = self.sink.capture_image(&ctx).await?;
        info!(label = %record.label, path = %record.path.display(), "image captured");
        self.log.push(record.clone());
        Ok(record)
    }

    /// Start a batch run over the given specs using the session's current
    /// label, folder, scenario, and location.
    ///
    /// # Errors
    /// Same preconditions as [`Self::capture_single`], plus the scheduler's
    /// start errors (empty queue, already running).
    pub async fn start_batch(
        &self,
        specs: &[CaptureJobSpec],
        inter_item_delay: Duration,
        randomize: bool,
    ) -> Result<()> {
        if !self.camera.is_active() {
            return Err(DatacamError::Camera("camera is not active".into()));
        }
        let ctx = self.capture_context()?;
        self.scheduler.start(specs, ctx, inter_item_delay, randomize).await.map_err(Into::into)
    }

    /// Pause the active batch run.
    ///
    /// # Errors
    /// Propagates the scheduler's state errors.
    pub fn pause_batch(&self) -> Result<()> {
        self.scheduler.pause().map_err(Into::into)
    }

    /// Resume the paused batch run.
    ///
    /// # Errors
    /// Propagates the scheduler's state errors.
    pub async fn resume_batch(&self) -> Result<()> {
        self.scheduler.resume().await.map_err(Into::into)
    }

    /// Stop the active batch run.
    ///
    /// # Errors
    /// Propagates the scheduler's state errors.
    pub async fn stop_batch(&self) -> Result<()> {
        self.scheduler.stop().await.map_err(Into::into)
    }

    /// Captured records in capture order.
    pub fn records(&self) -> Vec<CaptureRecord> {
        self.log.records()
    }

    /// Delete a captured record by id.
    ///
    /// Removes the record from the log only; the stored image file is kept,
    /// mirroring the interactive delete behavior.
    ///
    /// # Errors
    /// `NotFound` when no record carries the id.
    pub fn delete_record(&self, id: i64) -> Result<()> {
        if self.log.remove(id) {
            Ok(())
        } else {
            Err(DatacamError::NotFound(format!("no captured image with id {id}")))
        }
    }

    /// Build the dataset manifest from the captured records.
    ///
    /// # Errors
    /// `InvalidInput` when no project folder is selected or nothing was
    /// captured yet.
    pub fn build_manifest(&self) -> Result<DatasetManifest> {
        let project_dir = self
            .state
            .lock()
            .project_dir
            .clone()
            .ok_or_else(|| DatacamError::InvalidInput("no project folder selected".into()))?;

        let records = self.log.records();
        if records.is_empty() {
            return Err(DatacamError::InvalidInput("no images captured yet".into()));
        }

        // Group by label, preserving first-appearance order.
        let mut classes: Vec<ClassSummary> = Vec::new();
        for record in &records {
            match classes.iter_mut().find(|class| class.name == record.label) {
                Some(class) => class.count += 1,
                None => classes.push(ClassSummary {
                    name: record.label.clone(),
                    count: 1,
                    path: format!("{}/", project_dir.join(&record.label).display()),
                }),
            }
        }

        let name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(DatasetManifest {
            project_info: ProjectInfo {
                name,
                path: project_dir,
                date_created: Utc::now(),
                total_images: records.len(),
            },
            classes,
            images: records,
        })
    }

    /// Build and persist the dataset manifest into the project folder.
    ///
    /// # Errors
    /// Same as [`Self::build_manifest`], plus manifest store failures.
    #[instrument(skip(self))]
    pub async fn export_manifest(&self) -> Result<PathBuf> {
        let manifest = self.build_manifest()?;
        let path = manifest.project_info.path.join(&self.manifest_filename);
        let written = self.manifests.save_manifest(&manifest, &path).await?;
        info!(path = %written.display(), images = manifest.project_info.total_images, "manifest exported");
        Ok(written)
    }

    fn ensure_no_active_batch(&self) -> Result<()> {
        if self.scheduler.is_active() {
            return Err(DatacamError::InvalidInput(
                "a batch run is active; the camera is owned by the run controller".into(),
            ));
        }
        Ok(())
    }

    fn capture_context(&self) -> Result<CaptureContext> {
        let state = self.state.lock();
        let label = state
            .current_label
            .clone()
            .ok_or_else(|| DatacamError::InvalidInput("no label selected".into()))?;
        let project_dir = state
            .project_dir
            .clone()
            .ok_or_else(|| DatacamError::InvalidInput("no project folder selected".into()))?;
        Ok(CaptureContext {
            project_dir,
            label,
            scenario: state.scenario.clone(),
            location: state.capture_location(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    use async_trait::async_trait;
    use datacam_domain::CaptureLocation;

    use super::*;
    use crate::batch::ports::{CameraFrame, NoopBatchEvents};
    use crate::batch::BatchTiming;

    #[derive(Default)]
    struct StubCamera {
        active: AtomicBool,
    }

    #[async_trait]
    impl CameraController for StubCamera {
        async fn start_camera(&self, _width: u32, _height: u32) -> Result<()> {
            self.active.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop_camera(&self) -> Result<()> {
            self.active.store(false, Ordering::SeqCst);
            Ok(())
        }

        async fn grab_frame(&self) -> Result<CameraFrame> {
            Ok(CameraFrame { width: 2, height: 2, pixels: vec![0; 12] })
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct StubSink {
        next_id: AtomicI64,
    }

    #[async_trait]
    impl CaptureSink for StubSink {
        async fn capture_image(&self, ctx: &CaptureContext) -> Result<CaptureRecord> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(CaptureRecord {
                id,
                label: ctx.label.clone(),
                filename: format!("{}_{id}.jpg", ctx.label),
                path: ctx.project_dir.join(&ctx.label).join(format!("{}_{id}.jpg", ctx.label)),
                resolution: "640x480".into(),
                timestamp: Utc::now(),
                scenario: ctx.scenario.clone(),
                location: ctx.location.clone(),
            })
        }
    }

    struct StubLocation;

    #[async_trait]
    impl LocationProvider for StubLocation {
        async fn current_location(&self) -> Result<GeoLocation> {
            Ok(GeoLocation {
                latitude: 37.7749,
                longitude: -122.4194,
                city: "San Francisco".into(),
                country: "United States".into(),
            })
        }
    }

    #[derive(Default)]
    struct MemoryManifestStore {
        saved: Mutex<Option<(DatasetManifest, PathBuf)>>,
    }

    #[async_trait]
    impl ManifestStore for MemoryManifestStore {
        async fn save_manifest(
            &self,
            manifest: &DatasetManifest,
            path: &Path,
        ) -> Result<PathBuf> {
            *self.saved.lock() = Some((manifest.clone(), path.to_path_buf()));
            Ok(path.to_path_buf())
        }
    }

    struct Fixture {
        service: SessionService,
        manifests: Arc<MemoryManifestStore>,
        log: CaptureLog,
    }

    fn fixture() -> Fixture {
        let camera = Arc::new(StubCamera::default());
        let sink = Arc::new(StubSink::default());
        let manifests = Arc::new(MemoryManifestStore::default());
        let log = CaptureLog::new();
        let scheduler = Arc::new(BatchCaptureScheduler::new(
            camera.clone(),
            sink.clone(),
            Arc::new(NoopBatchEvents),
            log.clone(),
            BatchTiming {
                stabilization_delay: Duration::from_millis(10),
                max_consecutive_failures: 25,
            },
        ));
        let service = SessionService::new(
            camera,
            sink,
            Arc::new(StubLocation),
            manifests.clone(),
            scheduler,
            log.clone(),
            &SessionConfig::default(),
        );
        Fixture { service, manifests, log }
    }

    async fn ready_to_capture(fx: &Fixture) {
        fx.service.set_project_dir(PathBuf::from("/data/warehouse"));
        fx.service.select_label("dog").expect("default label exists");
        fx.service.start_camera(640, 480).await.expect("camera starts");
    }

    #[tokio::test]
    async fn add_label_trims_and_selects() {
        let fx = fixture();
        assert_eq!(fx.service.add_label("  bird ").unwrap(), "bird");
        assert_eq!(fx.service.current_label(), Some("bird".into()));
        assert_eq!(fx.service.labels().len(), 5);
    }

    #[tokio::test]
    async fn duplicate_label_is_selected_not_duplicated() {
        let fx = fixture();
        fx.service.add_label("dog").expect("existing label accepted");
        assert_eq!(fx.service.labels().len(), 4);
        assert_eq!(fx.service.current_label(), Some("dog".into()));
    }

    #[tokio::test]
    async fn empty_label_is_rejected() {
        let fx = fixture();
        assert!(matches!(
            fx.service.add_label("   "),
            Err(DatacamError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn unknown_label_selection_is_not_found() {
        let fx = fixture();
        assert!(matches!(
            fx.service.select_label("giraffe"),
            Err(DatacamError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn capture_single_requires_label_and_folder() {
        let fx = fixture();
        fx.service.start_camera(640, 480).await.expect("camera starts");

        // No label selected yet.
        assert!(matches!(
            fx.service.capture_single().await,
            Err(DatacamError::InvalidInput(_))
        ));

        fx.service.select_label("dog").expect("default label exists");
        // Still no project folder.
        assert!(matches!(
            fx.service.capture_single().await,
            Err(DatacamError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn capture_single_requires_an_active_camera() {
        let fx = fixture();
        fx.service.set_project_dir(PathBuf::from("/data/warehouse"));
        fx.service.select_label("dog").expect("default label exists");

        assert!(matches!(
            fx.service.capture_single().await,
            Err(DatacamError::Camera(_))
        ));
    }

    #[tokio::test]
    async fn capture_single_appends_a_record() {
        let fx = fixture();
        ready_to_capture(&fx).await;
        fx.service.set_scenario("loading dock, overcast");

        let record = fx.service.capture_single().await.expect("capture succeeds");
        assert_eq!(record.label, "dog");
        assert_eq!(record.scenario, "loading dock, overcast");
        assert_eq!(fx.log.len(), 1);
    }

    #[tokio::test]
    async fn capture_uses_refreshed_geolocation() {
        let fx = fixture();
        ready_to_capture(&fx).await;

        let geo = fx.service.refresh_location().await.expect("lookup succeeds");
        assert_eq!(geo.city, "San Francisco");

        let record = fx.service.capture_single().await.expect("capture succeeds");
        assert!(matches!(record.location, Some(CaptureLocation::Geo(_))));
    }

    #[tokio::test]
    async fn single_shot_path_is_blocked_while_batch_is_active() {
        let fx = fixture();
        ready_to_capture(&fx).await;

        fx.service
            .start_batch(
                &[CaptureJobSpec { width: 640, height: 480, count: 3 }],
                Duration::from_secs(3600),
                false,
            )
            .await
            .expect("batch starts");

        assert!(matches!(
            fx.service.capture_single().await,
            Err(DatacamError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.service.start_camera(1280, 720).await,
            Err(DatacamError::InvalidInput(_))
        ));
        assert!(matches!(
            fx.service.stop_camera().await,
            Err(DatacamError::InvalidInput(_))
        ));

        fx.service.stop_batch().await.expect("stop succeeds");
        fx.service.capture_single().await.expect("single shot works again");
    }

    #[tokio::test]
    async fn manifest_groups_records_by_label() {
        let fx = fixture();
        ready_to_capture(&fx).await;

        fx.service.capture_single().await.expect("dog capture");
        fx.service.capture_single().await.expect("dog capture");
        fx.service.select_label("cat").expect("default label exists");
        fx.service.capture_single().await.expect("cat capture");

        let manifest = fx.service.build_manifest().expect("manifest builds");
        assert_eq!(manifest.project_info.name, "warehouse");
        assert_eq!(manifest.project_info.total_images, 3);
        assert_eq!(manifest.classes.len(), 2);
        assert_eq!(manifest.classes[0].name, "dog");
        assert_eq!(manifest.classes[0].count, 2);
        assert_eq!(manifest.classes[1].name, "cat");
        assert!(manifest.classes[0].path.ends_with('/'));
    }

    #[tokio::test]
    async fn manifest_export_requires_records() {
        let fx = fixture();
        fx.service.set_project_dir(PathBuf::from("/data/warehouse"));
        assert!(matches!(
            fx.service.export_manifest().await,
            Err(DatacamError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn manifest_export_writes_into_the_project_folder() {
        let fx = fixture();
        ready_to_capture(&fx).await;
        fx.service.capture_single().await.expect("capture succeeds");

        let path = fx.service.export_manifest().await.expect("export succeeds");
        assert_eq!(path, PathBuf::from("/data/warehouse/tensorflow_metadata.json"));

        let saved = fx.manifests.saved.lock();
        let (manifest, saved_path) = saved.as_ref().expect("store invoked");
        assert_eq!(*saved_path, path);
        assert_eq!(manifest.images.len(), 1);
    }

    #[tokio::test]
    async fn delete_record_removes_it_from_the_log() {
        let fx = fixture();
        ready_to_capture(&fx).await;
        let record = fx.service.capture_single().await.expect("capture succeeds");

        fx.service.delete_record(record.id).expect("delete succeeds");
        assert!(fx.log.is_empty());
        assert!(matches!(
            fx.service.delete_record(record.id),
            Err(DatacamError::NotFound(_))
        ));
    }
}
