//! Batch capture run controller
//!
//! Drives the camera through a built queue of capture jobs, one item at a
//! time: reconfigure the stream, wait for the image to stabilize, capture,
//! wait the operator-configured delay, repeat. Failed reconfigurations and
//! failed captures skip the item without delay; the run always reaches a
//! terminal status. Join handles are tracked and cancellation is explicit so
//! a wait cancelled by `pause`/`stop` can never continue the pipeline.

use std::sync::Arc;
use std::time::Duration;

use datacam_domain::{
    BatchProgress, BatchRunState, BatchStatus, CaptureConfig, CaptureContext, CaptureJobItem,
    CaptureJobSpec,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::ports::{BatchEvents, CameraController, CaptureSink};
use super::queue::build_queue;
use crate::session::log::CaptureLog;

/// Upper bound on waiting for a parked driver task to settle.
const DRIVER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing and resilience parameters for batch runs.
#[derive(Debug, Clone, Copy)]
pub struct BatchTiming {
    /// Wait after a camera reconfiguration before capturing.
    pub stabilization_delay: Duration,
    /// Consecutive skipped items after which the run is aborted.
    pub max_consecutive_failures: u32,
}

impl Default for BatchTiming {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

impl From<&CaptureConfig> for BatchTiming {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            stabilization_delay: Duration::from_millis(config.stabilization_delay_ms),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Everything the driver task shares with the control surface.
struct RunShared {
    camera: Arc<dyn CameraController>,
    sink: Arc<dyn CaptureSink>,
    events: Arc<dyn BatchEvents>,
    log: CaptureLog,
    timing: BatchTiming,
    state: Mutex<BatchRunState>,
    progress: watch::Sender<BatchProgress>,
}

impl RunShared {
    fn publish_progress(&self) {
        let snapshot = self.state.lock().progress();
        self.progress.send_replace(snapshot);
    }
}

/// Per-run parameters fixed at start and reused on resume.
struct RunParams {
    ctx: CaptureContext,
    inter_item_delay: Duration,
}

/// Sequential, resumable, interruptible batch capture state machine.
///
/// Owns the run state exclusively while a batch is active; the UI layer reads
/// progress snapshots and issues control requests only. Items are processed
/// strictly in the order produced at queue build time, one at a time, with a
/// single camera stream active.
pub struct BatchCaptureScheduler {
    shared: Arc<RunShared>,
    params: Mutex<Option<RunParams>>,
    cancellation: Mutex<CancellationToken>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl BatchCaptureScheduler {
    /// Create a scheduler over the given collaborators.
    pub fn new(
        camera: Arc<dyn CameraController>,
        sink: Arc<dyn CaptureSink>,
        events: Arc<dyn BatchEvents>,
        log: CaptureLog,
        timing: BatchTiming,
    ) -> Self {
        let (progress, _) = watch::channel(BatchProgress::idle());
        Self {
            shared: Arc::new(RunShared {
                camera,
                sink,
                events,
                log,
                timing,
                state: Mutex::new(BatchRunState::idle()),
                progress,
            }),
            params: Mutex::new(None),
            cancellation: Mutex::new(CancellationToken::new()),
            driver: Mutex::new(None),
        }
    }

    /// Start a batch run over the given specs.
    ///
    /// Builds a fresh queue (optionally shuffled) and spawns the driver task.
    ///
    /// # Errors
    /// [`SchedulerError::EmptyQueue`] when no spec contributes items;
    /// [`SchedulerError::AlreadyRunning`] while a run is active.
    #[instrument(skip_all, fields(specs = specs.len(), randomize))]
    pub async fn start(
        &self,
        specs: &[CaptureJobSpec],
        ctx: CaptureContext,
        inter_item_delay: Duration,
        randomize: bool,
    ) -> SchedulerResult<()> {
        if self.shared.state.lock().status.is_active() {
            return Err(SchedulerError::AlreadyRunning);
        }

        // Settle a driver left over from a previous terminal run.
        let stale = self.driver.lock().take();
        if let Some(handle) = stale {
            Self::join_driver(handle).await?;
        }

        let token = {
            let mut state = self.shared.state.lock();
            if state.status.is_active() {
                return Err(SchedulerError::AlreadyRunning);
            }
            let queue = build_queue(specs, randomize)?;
            info!(items = queue.len(), randomize, "starting batch run");
            *state = BatchRunState::start(queue);
            *self.params.lock() = Some(RunParams { ctx, inter_item_delay });
            let token = CancellationToken::new();
            *self.cancellation.lock() = token.clone();
            token
        };

        self.shared.publish_progress();
        self.spawn_driver(token);
        Ok(())
    }

    /// Pause the run after the current suspension point.
    ///
    /// Cancels any pending wait; the cursor stays on the item in flight so
    /// `resume` neither drops nor duplicates work.
    ///
    /// # Errors
    /// [`SchedulerError::NotRunning`] unless the run is currently running.
    #[instrument(skip(self))]
    pub fn pause(&self) -> SchedulerResult<()> {
        {
            let mut state = self.shared.state.lock();
            if state.status != BatchStatus::Running {
                return Err(SchedulerError::NotRunning);
            }
            state.status = BatchStatus::Paused;
        }
        self.cancellation.lock().cancel();
        self.shared.publish_progress();
        info!("batch capture paused");
        Ok(())
    }

    /// Resume a paused run at the current cursor.
    ///
    /// # Errors
    /// [`SchedulerError::NotPaused`] unless the run is paused;
    /// [`SchedulerError::DriverJoinTimeout`] when the parked driver does not
    /// settle in time (the run stays paused).
    #[instrument(skip(self))]
    pub async fn resume(&self) -> SchedulerResult<()> {
        {
            let state = self.shared.state.lock();
            if state.status != BatchStatus::Paused {
                return Err(SchedulerError::NotPaused);
            }
        }

        // The previous driver must be parked before a new one may own the
        // run state.
        let parked = self.driver.lock().take();
        if let Some(handle) = parked {
            Self::join_driver(handle).await?;
        }

        let token = {
            let mut state = self.shared.state.lock();
            if state.status != BatchStatus::Paused {
                return Err(SchedulerError::NotPaused);
            }
            state.status = BatchStatus::Running;
            let token = CancellationToken::new();
            *self.cancellation.lock() = token.clone();
            token
        };

        self.shared.publish_progress();
        info!("batch capture resumed");
        self.spawn_driver(token);
        Ok(())
    }

    /// Stop the run, freezing `completed_count` at its current value.
    ///
    /// # Errors
    /// [`SchedulerError::NotRunning`] unless a run is active.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> SchedulerResult<()> {
        let captured = {
            let mut state = self.shared.state.lock();
            if !state.status.is_active() {
                return Err(SchedulerError::NotRunning);
            }
            state.status = BatchStatus::Stopped;
            state.current_item = None;
            state.completed_count
        };

        self.cancellation.lock().cancel();
        let parked = self.driver.lock().take();
        if let Some(handle) = parked {
            if let Err(err) = Self::join_driver(handle).await {
                warn!(error = %err, "driver lagged past stop");
            }
        }

        self.shared.publish_progress();
        info!(captured, "batch capture stopped");
        self.shared.events.on_stopped(captured).await;
        Ok(())
    }

    /// Current progress snapshot.
    pub fn progress(&self) -> BatchProgress {
        self.shared.progress.borrow().clone()
    }

    /// Subscribe to progress snapshots, published after every state
    /// mutation.
    pub fn subscribe(&self) -> watch::Receiver<BatchProgress> {
        self.shared.progress.subscribe()
    }

    /// Current run status.
    pub fn status(&self) -> BatchStatus {
        self.shared.state.lock().status
    }

    /// Whether a run is in progress (running or paused).
    pub fn is_active(&self) -> bool {
        self.status().is_active()
    }

    /// Clone of the full run state, for inspection and reporting.
    pub fn state_snapshot(&self) -> BatchRunState {
        self.shared.state.lock().clone()
    }

    fn spawn_driver(&self, cancel: CancellationToken) {
        let run = {
            let params = self.params.lock();
            params.as_ref().map(|p| (p.ctx.clone(), p.inter_item_delay))
        };
        // Params are set at every start; a missing entry means no run to
        // drive.
        let Some((ctx, inter_item_delay)) = run else { return };

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            drive(shared, ctx, inter_item_delay, cancel).await;
        });
        *self.driver.lock() = Some(handle);
    }

    async fn join_driver(handle: JoinHandle<()>) -> SchedulerResult<()> {
        match tokio::time::timeout(DRIVER_JOIN_TIMEOUT, handle).await {
            Ok(_) => Ok(()),
            Err(_) => {
                Err(SchedulerError::DriverJoinTimeout { seconds: DRIVER_JOIN_TIMEOUT.as_secs() })
            }
        }
    }
}

impl Drop for BatchCaptureScheduler {
    fn drop(&mut self) {
        if self.shared.state.lock().status.is_active() {
            warn!("BatchCaptureScheduler dropped while a run is active; cancelling driver");
            self.cancellation.lock().cancel();
        }
    }
}

/// What the driver found when it looked for the next item.
enum NextStep {
    Item(CaptureJobItem),
    Finished(usize),
}

/// The run loop. One invocation owns the run until the queue is exhausted,
/// the run is cancelled, or too many consecutive items fail.
async fn drive(
    shared: Arc<RunShared>,
    ctx: CaptureContext,
    inter_item_delay: Duration,
    cancel: CancellationToken,
) {
    let mut consecutive_failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let next = {
            let mut state = shared.state.lock();
            if state.status != BatchStatus::Running {
                return;
            }
            match state.next_item() {
                Some(item) => {
                    state.current_item = Some(item);
                    NextStep::Item(item)
                }
                None => {
                    state.status = BatchStatus::Completed;
                    state.current_item = None;
                    NextStep::Finished(state.completed_count)
                }
            }
        };

        let item = match next {
            NextStep::Finished(captured) => {
                shared.publish_progress();
                info!(captured, "batch capture complete");
                shared.events.on_completed(captured).await;
                return;
            }
            NextStep::Item(item) => item,
        };

        shared.publish_progress();
        debug!(
            resolution = %item.resolution_label(),
            sequence = item.sequence_index,
            of = item.group_total,
            "processing batch item"
        );

        if let Err(err) = shared.camera.start_camera(item.width, item.height).await {
            warn!(
                resolution = %item.resolution_label(),
                error = %err,
                "camera reconfiguration failed; skipping item"
            );
            if skip_item(&shared, &mut consecutive_failures).await {
                return;
            }
            continue;
        }

        // Let auto-exposure and focus settle before grabbing the frame.
        if !sleep_unless_cancelled(&cancel, shared.timing.stabilization_delay).await {
            return;
        }
        if shared.state.lock().status != BatchStatus::Running {
            return;
        }

        match shared.sink.capture_image(&ctx).await {
            Ok(record) => {
                shared.log.push(record);
                let status = {
                    let mut state = shared.state.lock();
                    // Stop freezes run accounting; the frame was already
                    // persisted, so the record above stays in the log.
                    if state.status != BatchStatus::Stopped {
                        state.advance_captured();
                    }
                    state.status
                };
                consecutive_failures = 0;
                shared.publish_progress();
                if status != BatchStatus::Running {
                    return;
                }
                if !sleep_unless_cancelled(&cancel, inter_item_delay).await {
                    return;
                }
            }
            Err(err) => {
                if shared.state.lock().status != BatchStatus::Running {
                    // The item was not consumed; resume retries it.
                    return;
                }
                warn!(error = %err, "capture failed; skipping item");
                if skip_item(&shared, &mut consecutive_failures).await {
                    return;
                }
            }
        }
    }
}

/// Advance past a failed item without counting it as captured.
///
/// Returns `true` when the driver must exit: the run was paused/stopped in
/// the meantime, or the consecutive-failure cap was reached and the run was
/// aborted.
async fn skip_item(shared: &Arc<RunShared>, consecutive_failures: &mut u32) -> bool {
    *consecutive_failures += 1;

    enum Outcome {
        Continue,
        Exit,
        Abort(usize),
    }

    let outcome = {
        let mut state = shared.state.lock();
        if state.status != BatchStatus::Running {
            Outcome::Exit
        } else {
            state.advance_skipped();
            if *consecutive_failures >= shared.timing.max_consecutive_failures {
                state.status = BatchStatus::Stopped;
                state.current_item = None;
                Outcome::Abort(state.completed_count)
            } else {
                Outcome::Continue
            }
        }
    };

    shared.publish_progress();
    match outcome {
        Outcome::Continue => false,
        Outcome::Exit => true,
        Outcome::Abort(captured) => {
            warn!(
                captured,
                limit = shared.timing.max_consecutive_failures,
                "aborting batch run after consecutive failures"
            );
            shared.events.on_stopped(captured).await;
            true
        }
    }
}

/// Wait for `duration`, or return `false` immediately when the run token is
/// cancelled first.
async fn sleep_unless_cancelled(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}
