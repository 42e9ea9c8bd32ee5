//! Application error types

use hueshift_gatekeeper::IntakeError;
use hueshift_remote::RemoteError;
use hueshift_rotator::RotationError;
use hueshift_store::StoreError;
use thiserror::Error;

/// Errors raised while assembling or running the bot
///
/// Only startup errors end the process; once running, failures are
/// classified inside the rotation and intake layers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Config file or asset storage problem
    #[error("Configuration error: {0}")]
    Store(#[from] StoreError),

    /// Rotation task error
    #[error("Rotation error: {0}")]
    Rotation(#[from] RotationError),

    /// Intake setup error
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    /// Remote API error
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}
