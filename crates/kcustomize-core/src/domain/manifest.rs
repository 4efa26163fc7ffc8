//! Customize manifest and file identities
//!
//! A manifest names one kintone app and three ordered file lists. The
//! position of an entry inside its list is part of its [`FileIdentity`],
//! so reordering a list gives every entry after the reorder point a new
//! identity (and invalidates any handle cached for it).

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Who can see the customization on the remote app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CustomizeScope {
    All,
    Admin,
    None,
}

/// Desktop script and style lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopFiles<T> {
    #[serde(default = "Vec::new")]
    pub js: Vec<T>,
    #[serde(default = "Vec::new")]
    pub css: Vec<T>,
}

/// Mobile script list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileFiles<T> {
    #[serde(default = "Vec::new")]
    pub js: Vec<T>,
}

impl<T> Default for DesktopFiles<T> {
    fn default() -> Self {
        Self {
            js: Vec::new(),
            css: Vec::new(),
        }
    }
}

impl<T> Default for MobileFiles<T> {
    fn default() -> Self {
        Self { js: Vec::new() }
    }
}

/// The manifest file describing one app's customization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomizeManifest {
    /// Remote app id
    pub app: String,
    pub scope: CustomizeScope,
    #[serde(default)]
    pub desktop: DesktopFiles<String>,
    #[serde(default)]
    pub mobile: MobileFiles<String>,
}

impl CustomizeManifest {
    /// Parses a manifest from JSON text
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let manifest: CustomizeManifest =
            serde_json::from_str(content).context("Manifest is not a valid customize manifest")?;
        Ok(manifest)
    }

    /// Loads a manifest from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Returns the entries of one file group, in load order
    pub fn group(&self, group: FileGroup) -> &[String] {
        match group {
            FileGroup::DesktopJs => &self.desktop.js,
            FileGroup::DesktopCss => &self.desktop.css,
            FileGroup::MobileJs => &self.mobile.js,
        }
    }

    /// Iterates over every entry with its identity, group by group
    pub fn references(&self) -> impl Iterator<Item = (FileIdentity, FileReference)> + '_ {
        FileGroup::ALL.into_iter().flat_map(move |group| {
            self.group(group)
                .iter()
                .enumerate()
                .map(move |(index, entry)| (group.identity(index), FileReference::parse(entry)))
        })
    }

    /// Local file paths referenced by the manifest (URLs excluded)
    pub fn local_paths(&self) -> Vec<PathBuf> {
        self.references()
            .filter_map(|(_, reference)| match reference {
                FileReference::Local(path) => Some(path),
                FileReference::Url(_) => None,
            })
            .collect()
    }
}

/// Platform the file is loaded on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Desktop,
    Mobile,
}

/// Kind of content a file carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Script,
    Style,
}

impl ContentKind {
    /// MIME type sent with the upload
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentKind::Script => "text/javascript",
            ContentKind::Style => "text/css",
        }
    }
}

/// One of the three ordered lists of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileGroup {
    DesktopJs,
    DesktopCss,
    MobileJs,
}

impl FileGroup {
    /// All groups in manifest order
    pub const ALL: [FileGroup; 3] = [FileGroup::DesktopJs, FileGroup::DesktopCss, FileGroup::MobileJs];

    pub fn target(&self) -> Target {
        match self {
            FileGroup::DesktopJs | FileGroup::DesktopCss => Target::Desktop,
            FileGroup::MobileJs => Target::Mobile,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            FileGroup::DesktopJs | FileGroup::MobileJs => ContentKind::Script,
            FileGroup::DesktopCss => ContentKind::Style,
        }
    }

    /// Identity of the entry at `index` in this group
    pub fn identity(&self, index: usize) -> FileIdentity {
        FileIdentity {
            target: self.target(),
            kind: self.kind(),
            index,
        }
    }
}

/// Stable key of a manifest entry: (target, content kind, position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileIdentity {
    pub target: Target,
    pub kind: ContentKind,
    pub index: usize,
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.target {
            Target::Desktop => "desktop",
            Target::Mobile => "mobile",
        };
        let kind = match self.kind {
            ContentKind::Script => "js",
            ContentKind::Style => "css",
        };
        write!(f, "{}.{}[{}]", target, kind, self.index)
    }
}

/// A manifest entry: either an external URL or a local file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileReference {
    Url(String),
    Local(PathBuf),
}

impl FileReference {
    /// Classifies a manifest entry. Only `http://` and `https://` count as URLs.
    pub fn parse(entry: &str) -> Self {
        if is_url_string(entry) {
            FileReference::Url(entry.to_string())
        } else {
            FileReference::Local(PathBuf::from(entry))
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, FileReference::Url(_))
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileReference::Url(url) => f.write_str(url),
            FileReference::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

fn is_url_string(entry: &str) -> bool {
    entry.starts_with("https://") || entry.starts_with("http://")
}
