//! Application context wiring
//!
//! Assembles the adapters, the scheduler, and the session service from a
//! loaded configuration. The UI layer holds an `AppContext` and talks to the
//! services only.

use std::sync::Arc;

use datacam_core::{
    BatchCaptureScheduler, BatchEvents, BatchTiming, CameraController, CaptureLog, CaptureSink,
    LocationProvider, ManifestStore, NoopBatchEvents, SessionService,
};
use datacam_domain::Config;
use tracing::{info, warn};

use crate::camera::{list_devices, NokhwaCameraController};
use crate::capture::FsCaptureSink;
use crate::location::StaticLocationProvider;
use crate::storage::JsonManifestStore;

/// Fully wired application services.
pub struct AppContext {
    pub config: Config,
    pub session: Arc<SessionService>,
    pub scheduler: Arc<BatchCaptureScheduler>,
    pub capture_log: CaptureLog,
}

impl AppContext {
    /// Wire the application with no terminal-event listener.
    pub fn build(config: Config) -> Self {
        Self::build_with_events(config, Arc::new(NoopBatchEvents))
    }

    /// Wire the application, routing batch terminal notifications to
    /// `events`.
    pub fn build_with_events(config: Config, events: Arc<dyn BatchEvents>) -> Self {
        match list_devices() {
            Ok(devices) if devices.is_empty() => warn!("no capture devices found"),
            Ok(devices) => info!(?devices, "capture devices found"),
            Err(err) => warn!(error = %err, "device enumeration failed"),
        }

        let camera: Arc<dyn CameraController> =
            Arc::new(NokhwaCameraController::new(&config.camera));
        let sink: Arc<dyn CaptureSink> = Arc::new(FsCaptureSink::new(Arc::clone(&camera)));
        let log = CaptureLog::new();

        let scheduler = Arc::new(BatchCaptureScheduler::new(
            Arc::clone(&camera),
            Arc::clone(&sink),
            events,
            log.clone(),
            BatchTiming::from(&config.capture),
        ));

        let location: Arc<dyn LocationProvider> = Arc::new(StaticLocationProvider::default());
        let manifests: Arc<dyn ManifestStore> = Arc::new(JsonManifestStore);
        let session = Arc::new(SessionService::new(
            camera,
            sink,
            location,
            manifests,
            Arc::clone(&scheduler),
            log.clone(),
            &config.session,
        ));

        Self { config, session, scheduler, capture_log: log }
    }
}

#[cfg(test)]
mod tests {
    use datacam_domain::BatchStatus;

    use super::*;

    #[test]
    fn build_wires_an_idle_session() {
        let context = AppContext::build(Config::default());
        assert_eq!(context.session.labels().len(), 4);
        assert_eq!(context.scheduler.status(), BatchStatus::Idle);
        assert!(context.capture_log.is_empty());
    }
}
