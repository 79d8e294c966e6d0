//! Scheduler error types

use datacam_domain::DatacamError;
use thiserror::Error;

/// Scheduler-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// No enabled job specs were supplied at start
    #[error("No enabled capture jobs in the batch request")]
    EmptyQueue,

    /// A batch run is already active
    #[error("A batch run is already active")]
    AlreadyRunning,

    /// No batch run is active
    #[error("No batch run is active")]
    NotRunning,

    /// The run is active but not paused
    #[error("The batch run is not paused")]
    NotPaused,

    /// The driver task did not settle within the join timeout
    #[error("Batch driver did not settle within {seconds}s")]
    DriverJoinTimeout { seconds: u64 },
}

impl From<SchedulerError> for DatacamError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::DriverJoinTimeout { .. } => Self::Internal(err.to_string()),
            _ => Self::InvalidInput(err.to_string()),
        }
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
