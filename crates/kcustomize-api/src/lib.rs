//! kcustomize API - kintone REST API client
//!
//! Provides an async client for the kintone endpoints the customize
//! workflow needs:
//! - File upload (`/k/v1/file.json`)
//! - Preview customize setting (`/k/v1/preview/app/customize.json`)
//! - Deployment and its status (`/k/v1/preview/app/deploy.json`)
//! - Live customize setting (`/k/v1/app/customize.json`)
//!
//! ## Modules
//!
//! - [`client`] - HTTP client with kintone authentication headers
//! - [`upload`] - Multipart file upload
//! - [`customize`] - Customize setting read/replace
//! - [`deploy`] - Deployment trigger and status
//! - [`provider`] - [`ICustomizeClient`](kcustomize_core::ports::ICustomizeClient) implementation

pub mod client;
pub mod customize;
pub mod deploy;
pub mod provider;
pub mod upload;

use std::path::PathBuf;

use kcustomize_core::domain::CustomizeError;
use thiserror::Error;

pub use client::{ClientOptions, Credentials, KintoneClient};
pub use provider::KintoneCustomizeClient;

/// Error code kintone returns (with HTTP 520) for rejected credentials
pub const AUTHENTICATION_ERROR_CODE: &str = "CB_WA01";

/// Errors that can occur when communicating with kintone
#[derive(Debug, Error)]
pub enum KintoneError {
    /// Credentials were rejected (HTTP 520 with code `CB_WA01`)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// kintone answered with a non-success status
    #[error("kintone API error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// A file to upload could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The deployment ended in a non-success status
    #[error("Deployment of app {app} ended with status {status}")]
    DeployRejected { app: String, status: String },

    /// The client could not be built from the given settings
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl From<KintoneError> for CustomizeError {
    fn from(err: KintoneError) -> Self {
        match err {
            KintoneError::Authentication(message) => CustomizeError::Authentication(message),
            KintoneError::NetworkError(e) => CustomizeError::Network(e.to_string()),
            KintoneError::Api {
                status, message, ..
            } => CustomizeError::Remote { status, message },
            KintoneError::InvalidResponse(message) => CustomizeError::Remote { status: 0, message },
            KintoneError::Io { path, source } => CustomizeError::filesystem(path, &source),
            err @ KintoneError::DeployRejected { .. } => CustomizeError::Remote {
                status: 0,
                message: err.to_string(),
            },
            KintoneError::InvalidConfig(message) => CustomizeError::State(message),
        }
    }
}
