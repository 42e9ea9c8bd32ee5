//! Intake error types

use hueshift_domain::{ChannelId, FetchError};
use hueshift_store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while configuring intake or ingesting an attachment
///
/// Ingestion errors never escape [`crate::IntakeGate::submit`]; they are
/// reported to the submitter and logged.
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Two targets were registered for the same channel
    #[error("Channel {0} already has an intake target")]
    DuplicateChannel(ChannelId),

    /// The attachment could not be downloaded
    #[error("Download failed: {0}")]
    Fetch(#[from] FetchError),

    /// The downloaded bytes are not a recognizable image
    #[error("{0} is not an image")]
    NotAnImage(String),

    /// The download did not finish in time
    #[error("Download timed out after {0:?}")]
    Timeout(Duration),

    /// The downloaded bytes could not be stored
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// The blocking storage write could not run to completion
    #[error("Storage task failed: {0}")]
    StorageTask(#[from] tokio::task::JoinError),
}
