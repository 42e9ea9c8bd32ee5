//! Error types for remote API calls

use thiserror::Error;

/// Errors from guild API calls outside the apply path
///
/// Apply and fetch failures use the domain outcome types instead, so the
/// rotation core can classify them.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The HTTP client could not be built
    #[error("Client error: {0}")]
    Client(String),

    /// The request never produced a response
    #[error("Request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status
        status: u16,
        /// Response body
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    Decode(String),
}
