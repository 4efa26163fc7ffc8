//! Customize client port (driven/secondary port)
//!
//! This module defines the interface for the remote operations the
//! upload/deploy workflow needs. The primary implementation targets the
//! kintone REST API.
//!
//! ## Design Notes
//!
//! - Returns [`CustomizeError`] rather than `anyhow::Error`: the workflow
//!   must tell authentication failures from retryable ones.
//! - Each method is a single round-trip. Polling, delays and retries belong
//!   to the caller.

use std::path::Path;

use crate::domain::errors::CustomizeError;
use crate::domain::manifest::{ContentKind, FileReference};
use crate::domain::setting::{
    CustomizeEntry, CustomizeSetting, DeployStatus, FileKey, RemoteCustomize,
};

/// Port trait for remote customize operations
///
/// ## Error Contract
///
/// Every method fails with:
/// - [`CustomizeError::Network`] on transport failure
/// - [`CustomizeError::Authentication`] when credentials are rejected
/// - [`CustomizeError::Remote`] for any other non-success response
#[async_trait::async_trait]
pub trait ICustomizeClient: Send + Sync {
    /// Uploads one local file and returns its handle
    ///
    /// # Arguments
    /// * `path` - Local file to upload
    /// * `kind` - Content kind, used for the upload's MIME type
    async fn upload_file(&self, path: &Path, kind: ContentKind) -> Result<FileKey, CustomizeError>;

    /// Resolves a manifest entry into a customize entry
    ///
    /// URLs are passed through without any network call; local files are
    /// uploaded via [`ICustomizeClient::upload_file`].
    async fn resolve_entry(
        &self,
        reference: &FileReference,
        kind: ContentKind,
    ) -> Result<CustomizeEntry, CustomizeError> {
        match reference {
            FileReference::Url(url) => Ok(CustomizeEntry::url(url.clone())),
            FileReference::Local(path) => {
                let file_key = self.upload_file(path, kind).await?;
                Ok(CustomizeEntry::file(file_key))
            }
        }
    }

    /// Replaces the app's (preview) customize setting
    ///
    /// Sending the same payload twice is safe.
    async fn replace_configuration(&self, setting: &CustomizeSetting)
        -> Result<(), CustomizeError>;

    /// Requests deployment of the app's preview settings
    async fn trigger_deployment(&self, app: &str) -> Result<(), CustomizeError>;

    /// Checks the deployment status once
    async fn poll_deployment_status(&self, app: &str) -> Result<DeployStatus, CustomizeError>;

    /// Fetches the app's live customize setting
    async fn fetch_configuration(&self, app: &str) -> Result<RemoteCustomize, CustomizeError>;
}
