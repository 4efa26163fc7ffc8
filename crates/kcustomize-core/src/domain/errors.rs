//! Domain error types
//!
//! This module defines the error taxonomy shared by the tracker, the remote
//! client port, and the upload/deploy workflow. Only network and remote
//! failures are considered transient.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while uploading and deploying customizations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CustomizeError {
    /// Credentials were rejected by the remote platform
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request never produced an HTTP response (DNS, TLS, connection reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The remote platform answered with a non-success response
    #[error("Remote error (status {status}): {message}")]
    Remote {
        /// HTTP status code, 0 when the body of a success response was unusable
        status: u16,
        /// Message extracted from the response body
        message: String,
    },

    /// A referenced local file is missing or unreadable
    #[error("Filesystem error for {path}: {reason}")]
    Filesystem {
        /// The offending path
        path: PathBuf,
        /// Underlying I/O failure
        reason: String,
    },

    /// Internal contract violation
    #[error("State error: {0}")]
    State(String),

    /// The operation was cancelled before it finished
    #[error("Operation cancelled")]
    Cancelled,
}

impl CustomizeError {
    /// Builds a filesystem error from an I/O error
    pub fn filesystem(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        CustomizeError::Filesystem {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    /// Returns true if the credentials were rejected
    pub fn is_authentication(&self) -> bool {
        matches!(self, CustomizeError::Authentication(_))
    }

    /// Returns true if retrying the failed stage may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CustomizeError::Network(_) | CustomizeError::Remote { .. }
        )
    }
}
