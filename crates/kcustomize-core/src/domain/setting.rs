//! Remote customize setting types
//!
//! These mirror the JSON documents exchanged with the kintone customize
//! endpoints: the replacement payload sent on update, the document returned
//! by a fetch, and the per-file entries both of them contain.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::manifest::{CustomizeManifest, CustomizeScope, DesktopFiles, FileGroup, MobileFiles};

/// Opaque handle returned by a successful file upload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(String);

impl FileKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File part of a `FILE` entry
///
/// Fetched settings also carry `name`, `contentType` and `size`; only the
/// key is needed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(rename = "fileKey")]
    pub file_key: FileKey,
}

/// A resolved manifest entry, ready to be sent to the remote app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum CustomizeEntry {
    /// Pass-through external URL
    Url { url: String },
    /// Previously uploaded file
    File { file: FileRef },
}

impl CustomizeEntry {
    pub fn url(url: impl Into<String>) -> Self {
        CustomizeEntry::Url { url: url.into() }
    }

    pub fn file(file_key: FileKey) -> Self {
        CustomizeEntry::File {
            file: FileRef { file_key },
        }
    }

    /// The file key, if this entry references an uploaded file
    pub fn file_key(&self) -> Option<&FileKey> {
        match self {
            CustomizeEntry::File { file } => Some(&file.file_key),
            CustomizeEntry::Url { .. } => None,
        }
    }
}

/// Replacement payload for the remote customize setting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizeSetting {
    pub app: String,
    pub scope: CustomizeScope,
    pub desktop: DesktopFiles<CustomizeEntry>,
    pub mobile: MobileFiles<CustomizeEntry>,
}

impl CustomizeSetting {
    /// Builds the payload from the three resolved groups of a manifest
    pub fn from_resolved(
        manifest: &CustomizeManifest,
        desktop_js: Vec<CustomizeEntry>,
        desktop_css: Vec<CustomizeEntry>,
        mobile_js: Vec<CustomizeEntry>,
    ) -> Self {
        Self {
            app: manifest.app.clone(),
            scope: manifest.scope,
            desktop: DesktopFiles {
                js: desktop_js,
                css: desktop_css,
            },
            mobile: MobileFiles { js: mobile_js },
        }
    }
}

/// Customize setting as returned by a fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCustomize {
    pub scope: CustomizeScope,
    #[serde(default)]
    pub desktop: DesktopFiles<CustomizeEntry>,
    #[serde(default)]
    pub mobile: MobileFiles<CustomizeEntry>,
    #[serde(default)]
    pub revision: Option<String>,
}

impl RemoteCustomize {
    /// Returns the entries of one file group
    pub fn group(&self, group: FileGroup) -> &[CustomizeEntry] {
        match group {
            FileGroup::DesktopJs => &self.desktop.js,
            FileGroup::DesktopCss => &self.desktop.css,
            FileGroup::MobileJs => &self.mobile.js,
        }
    }
}

/// Result of a single deployment status check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployStatus {
    /// True once every app in the deployment reports success
    pub done: bool,
}
