//! Domain types and business rules
//!
//! This module contains the core domain types for kcustomize:
//! - The customize manifest and its file references
//! - File identities (target, content kind, position)
//! - Prepared customize entries and the remote setting payload
//! - The file tracker used for incremental uploads
//! - Domain-specific error types

pub mod errors;
pub mod manifest;
pub mod setting;
pub mod tracker;

// Re-export commonly used types
pub use errors::CustomizeError;
pub use manifest::{
    ContentKind, CustomizeManifest, CustomizeScope, DesktopFiles, FileGroup, FileIdentity,
    FileReference, MobileFiles, Target,
};
pub use setting::{CustomizeEntry, CustomizeSetting, DeployStatus, FileKey, RemoteCustomize};
pub use tracker::FileTracker;
