//! Outcome module - failures reported by external collaborators

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain an asset's bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The fetch did not finish in time
    #[error("Fetch timed out")]
    Timeout,

    /// The source answered with a non-success status
    #[error("Fetch returned status {0}")]
    Status(u16),

    /// Network-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Local storage could not be read
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failure to apply a value to the remote resource
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The value violates a precondition of the target (e.g. image too
    /// small or too large); it may become valid later
    #[error("Content rejected: {0}")]
    ContentInvalid(String),

    /// The upstream is throttling this client
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Upstream hint for when calls may resume
        retry_after: Option<Duration>,
    },

    /// The upstream refused the call for another reason
    #[error("Rejected with status {status}: {message}")]
    Rejected {
        /// Response status
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The call never produced a response
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Upstream throttling notice observed independently of any task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSignal {
    /// Numeric status carried by the signal (usually 429)
    pub status: u16,

    /// Upstream hint for when calls may resume
    pub retry_after: Option<Duration>,

    /// Where the signal was observed (a resource name or an event source)
    pub source: String,
}

impl RateLimitSignal {
    /// Build the signal carried by a rate-limited apply outcome
    pub fn from_apply(source: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            status: 429,
            retry_after,
            source: source.into(),
        }
    }
}
