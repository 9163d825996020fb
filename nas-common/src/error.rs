//! Common error types for the needs assessment backend

use thiserror::Error;
use tracing::error;

use crate::validation::ValidationReport;
use crate::version::Precondition;

/// Common result type for needs assessment operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the needs assessment backend
#[derive(Error, Debug)]
pub enum Error {
    /// Requested form, submission or correction does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Declared submission version does not supersede the current one
    #[error("Expected correction for submission version {expected}, got {declared}")]
    Conflict {
        /// Current resolved version of the submission
        expected: u32,
        /// Precondition supplied by the caller
        declared: Precondition,
    },

    /// Response failed format or required checks
    #[error("Response is not valid")]
    InvalidResponse(ValidationReport),

    /// Unknown section/question id or wrong field count in a report query
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Store operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller can act on this error as reported
    ///
    /// Validation, not-found, conflict and malformed input are expected
    /// outcomes. Everything else is an internal failure.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::Conflict { .. }
                | Error::InvalidResponse(_)
                | Error::MalformedQuery(_)
                | Error::InvalidInput(_)
        )
    }

    /// Message safe to hand back to a caller
    ///
    /// Internal failures are logged together with a fresh correlation id and
    /// only the id is returned.
    pub fn public_message(&self) -> String {
        if self.is_expected() {
            return self.to_string();
        }
        let correlation_id = crate::uuid_utils::generate();
        error!(%correlation_id, error = %self, "Internal failure");
        format!("Internal failure (ref {})", correlation_id)
    }
}
