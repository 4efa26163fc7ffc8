//! kcustomize Sync - file watching and the watch loop
//!
//! Provides:
//! - Watching of the local files a manifest references
//! - Debouncing of rapid saves into settled change batches
//! - The watch loop that re-runs the upload/deploy workflow per batch
//!
//! ## Modules
//!
//! - [`watcher`] - `notify` wrapper and debounced change queue
//! - [`watch_loop`] - Sequential upload/deploy cycles driven by file changes

pub mod watch_loop;
pub mod watcher;

use std::path::PathBuf;

use thiserror::Error;

pub use watch_loop::{WatchLoop, WatchSettings};
pub use watcher::{ChangeEvent, DebouncedChangeQueue, FileWatcher};

/// Errors that can occur while setting up file watching
#[derive(Debug, Error)]
pub enum SyncError {
    /// A watched file could not be resolved
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// The OS watcher could not be created or could not watch a directory
    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// There is nothing to watch
    #[error("Manifest references no local files")]
    NothingToWatch,
}
