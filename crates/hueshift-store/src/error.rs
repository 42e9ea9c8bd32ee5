//! Error types for storage operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file does not exist
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Config file is not a JSON object
    #[error("Malformed config: {0}")]
    Parse(String),

    /// Required keys are absent
    #[error("Missing required configuration field(s): {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    /// A key holds a value of the wrong shape
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Offending key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// A path does not belong to the storage directory
    #[error("Path is outside the storage directory: {0}")]
    OutsideRoot(PathBuf),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
