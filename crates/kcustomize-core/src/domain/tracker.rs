//! File identity tracker
//!
//! Remembers, per [`FileIdentity`], the modification time a local file had
//! when it was last uploaded and the [`FileKey`] the upload produced. The
//! workflow consults it to reuse handles for files that have not changed
//! since their last upload.
//!
//! ## Freshness
//!
//! [`FileTracker::can_skip`] re-reads the file's modification time on every
//! call, so edits made between two workflow invocations are always seen.
//! A single mtime comparison is used instead of content hashing.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::errors::CustomizeError;
use super::manifest::{CustomizeManifest, FileGroup, FileIdentity, FileReference};
use super::setting::{FileKey, RemoteCustomize};

/// Sentinel modification time for URL-backed entries
const URL_MTIME: i64 = 0;

/// Tracked state of one manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
struct FileStatus {
    reference: FileReference,
    /// Milliseconds since the Unix epoch
    mtime: i64,
    file_key: Option<FileKey>,
}

/// Maps file identities to their last uploaded state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTracker {
    statuses: BTreeMap<FileIdentity, FileStatus>,
}

impl FileTracker {
    /// Builds one status per manifest entry, with no cached handles
    ///
    /// # Errors
    /// Returns [`CustomizeError::Filesystem`] if a local path cannot be stat'ed
    pub fn initialize(manifest: &CustomizeManifest) -> Result<Self, CustomizeError> {
        let mut statuses = BTreeMap::new();

        for (identity, reference) in manifest.references() {
            let mtime = match &reference {
                FileReference::Url(_) => URL_MTIME,
                FileReference::Local(path) => modified_millis(path)?,
            };
            statuses.insert(
                identity,
                FileStatus {
                    reference,
                    mtime,
                    file_key: None,
                },
            );
        }

        debug!(files = statuses.len(), app = %manifest.app, "Initialized file tracker");
        Ok(Self { statuses })
    }

    /// Returns true if the cached handle for `identity` can be reused
    ///
    /// URL entries are always up to date. Local entries need a cached handle
    /// and a current modification time equal to the stored one.
    pub fn can_skip(&self, identity: &FileIdentity) -> bool {
        let Some(status) = self.statuses.get(identity) else {
            return false;
        };

        match &status.reference {
            FileReference::Url(_) => true,
            FileReference::Local(path) => {
                if status.file_key.is_none() {
                    return false;
                }
                match modified_millis(path) {
                    Ok(current) => {
                        let unchanged = current == status.mtime;
                        trace!(%identity, stored = status.mtime, current, unchanged, "Skip check");
                        unchanged
                    }
                    Err(_) => false,
                }
            }
        }
    }

    /// Returns the cached handle for `identity`
    ///
    /// # Errors
    /// Returns [`CustomizeError::State`] if the identity was never uploaded
    pub fn handle(&self, identity: &FileIdentity) -> Result<FileKey, CustomizeError> {
        self.statuses
            .get(identity)
            .and_then(|status| status.file_key.clone())
            .ok_or_else(|| {
                CustomizeError::State(format!(
                    "handle requested for identity never uploaded: {}",
                    identity
                ))
            })
    }

    /// Reads the current modification time of the file behind `identity`
    ///
    /// Call this before the file's content is read for upload and pass the
    /// result to [`FileTracker::record_upload`]. URL entries report the
    /// sentinel time.
    ///
    /// # Errors
    /// Returns [`CustomizeError::State`] for an unknown identity and
    /// [`CustomizeError::Filesystem`] if the file cannot be stat'ed
    pub fn observe(&self, identity: &FileIdentity) -> Result<i64, CustomizeError> {
        let status = self.statuses.get(identity).ok_or_else(|| {
            CustomizeError::State(format!("unknown identity: {}", identity))
        })?;
        match &status.reference {
            FileReference::Url(_) => Ok(URL_MTIME),
            FileReference::Local(path) => modified_millis(path),
        }
    }

    /// Stores the handle of a fresh upload with the mtime observed before it
    ///
    /// The file is not stat'ed again: an edit saved while the upload was in
    /// flight must leave the stored mtime behind the file's, so the next
    /// skip check uploads the new content.
    ///
    /// # Errors
    /// Returns [`CustomizeError::State`] for an unknown identity
    pub fn record_upload(
        &mut self,
        identity: &FileIdentity,
        file_key: FileKey,
        observed_mtime: i64,
    ) -> Result<(), CustomizeError> {
        let status = self.statuses.get_mut(identity).ok_or_else(|| {
            CustomizeError::State(format!("upload recorded for unknown identity: {}", identity))
        })?;

        status.mtime = match &status.reference {
            FileReference::Url(_) => URL_MTIME,
            FileReference::Local(_) => observed_mtime,
        };
        debug!(%identity, file_key = %file_key, mtime = status.mtime, "Recorded upload");
        status.file_key = Some(file_key);
        Ok(())
    }

    /// Adopts file keys revealed by the remote customize setting
    ///
    /// Only positions where the remote entry is a file and the local entry
    /// is a local path are merged. Stored modification times are left
    /// untouched, so a file edited since it was last observed still uploads.
    /// Returns the number of handles adopted.
    pub fn merge_remote(&mut self, remote: &RemoteCustomize) -> usize {
        let mut merged = 0;

        for group in FileGroup::ALL {
            for (index, entry) in remote.group(group).iter().enumerate() {
                let Some(file_key) = entry.file_key() else {
                    continue;
                };
                let Some(status) = self.statuses.get_mut(&group.identity(index)) else {
                    continue;
                };
                if status.reference.is_url() {
                    continue;
                }
                status.file_key = Some(file_key.clone());
                merged += 1;
            }
        }

        debug!(merged, "Merged remote file keys into tracker");
        merged
    }

    /// Number of tracked identities
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Reads a file's modification time in milliseconds since the epoch
fn modified_millis(path: &Path) -> Result<i64, CustomizeError> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| CustomizeError::filesystem(path, &e))?;
    Ok(DateTime::<Utc>::from(modified).timestamp_millis())
}
