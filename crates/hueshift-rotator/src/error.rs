//! Error types for rotation operations

use hueshift_domain::ResourceKind;
use hueshift_store::StoreError;
use thiserror::Error;

/// Errors that can occur while controlling a rotation task
///
/// Failures of individual cycles are not errors: they are classified and
/// absorbed inside the task.
#[derive(Error, Debug)]
pub enum RotationError {
    /// `start` was called on a task whose loop is still running
    #[error("Rotation task for {0} is already running")]
    AlreadyRunning(ResourceKind),

    /// Rejected interval value
    #[error("Invalid interval: {0}")]
    InvalidInterval(String),

    /// Persistence layer error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
