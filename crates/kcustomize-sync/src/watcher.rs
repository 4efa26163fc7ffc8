//! File watching and debounced change queue
//!
//! Provides a [`FileWatcher`] that wraps the `notify` crate to monitor the
//! local files a manifest references, converting raw OS events into
//! [`ChangeEvent`] values.
//!
//! The [`DebouncedChangeQueue`] collects rapid-fire events and coalesces them
//! so that the watch loop only reacts once a file has been quiet for the
//! stabilization window.
//!
//! ## Architecture
//!
//! ```text
//! inotify / kqueue
//!       │
//!       ▼
//!  FileWatcher  ──→  mpsc::channel  ──→  DebouncedChangeQueue  ──→  WatchLoop
//! ```
//!
//! Watching a file directly loses track of it when an editor saves by
//! renaming a temporary file over it, so the parent directories are watched
//! non-recursively and events are filtered down to the manifest's files.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::SyncError;

/// Capacity of the channel between the OS watcher and the loop
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A change to one watched file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The file appeared, possibly by being renamed into place
    Created(PathBuf),
    /// The file's content or metadata changed
    Modified(PathBuf),
    /// The file was deleted or renamed away
    Removed(PathBuf),
}

impl ChangeEvent {
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) | ChangeEvent::Modified(p) | ChangeEvent::Removed(p) => p,
        }
    }
}

/// Watches a fixed set of files using the OS-native mechanism
///
/// ## Usage
///
/// ```ignore
/// let (watcher, rx) = FileWatcher::new(&manifest.local_paths())?;
/// // rx.recv().await to get events; dropping the watcher stops watching
/// ```
pub struct FileWatcher {
    /// The underlying notify watcher instance
    _watcher: RecommendedWatcher,
    /// Canonical paths of the watched files
    targets: Arc<HashSet<PathBuf>>,
}

impl FileWatcher {
    /// Starts watching `paths`
    ///
    /// Returns the watcher and a receiver channel for consuming change events.
    /// Dropping the watcher stops watching and closes the channel.
    ///
    /// # Errors
    /// - [`SyncError::NothingToWatch`] if `paths` is empty
    /// - [`SyncError::PathNotFound`] if a path cannot be canonicalized
    /// - [`SyncError::Watcher`] if the OS watcher fails
    pub fn new(paths: &[PathBuf]) -> Result<(Self, mpsc::Receiver<ChangeEvent>), SyncError> {
        if paths.is_empty() {
            return Err(SyncError::NothingToWatch);
        }

        let mut targets = HashSet::new();
        let mut directories = BTreeSet::new();
        for path in paths {
            let canonical = path
                .canonicalize()
                .map_err(|_| SyncError::PathNotFound(path.clone()))?;
            if let Some(parent) = canonical.parent() {
                directories.insert(parent.to_path_buf());
            }
            targets.insert(canonical);
        }
        let targets = Arc::new(targets);

        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(EVENT_CHANNEL_CAPACITY);
        let filter = Arc::clone(&targets);

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in map_notify_event(&event, &filter) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )?;

        for directory in &directories {
            watcher.watch(directory, RecursiveMode::NonRecursive)?;
            debug!(path = %directory.display(), "Watching directory");
        }

        info!(
            files = targets.len(),
            directories = directories.len(),
            "File watcher started"
        );

        Ok((
            Self {
                _watcher: watcher,
                targets,
            },
            event_rx,
        ))
    }

    #[cfg(test)]
    fn is_watched(&self, path: &Path) -> bool {
        self.targets.contains(path)
    }

    pub fn watched_count(&self) -> usize {
        self.targets.len()
    }
}

/// Converts a `notify::Event` into changes of watched files
///
/// Maps the notify event kinds as follows:
/// - `Create(*)` -> `ChangeEvent::Created`
/// - `Modify(Name(Both))` -> `Removed` for the old path, `Created` for the new one
/// - `Modify(Name(From))` -> `ChangeEvent::Removed`
/// - `Modify(Name(To))` -> `ChangeEvent::Created`
/// - Other `Modify(*)` -> `ChangeEvent::Modified`
/// - `Remove(*)` -> `ChangeEvent::Removed`
///
/// Paths outside `targets` and access events are dropped.
fn map_notify_event(event: &notify::Event, targets: &HashSet<PathBuf>) -> Vec<ChangeEvent> {
    let watched = |path: &PathBuf| targets.contains(path);

    let changes: Vec<ChangeEvent> = match &event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter(|p| watched(p))
            .map(|p| ChangeEvent::Created(p.clone()))
            .collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut changes = Vec::new();
            if let Some(old) = event.paths.first().filter(|p| watched(p)) {
                changes.push(ChangeEvent::Removed(old.clone()));
            }
            if let Some(new) = event.paths.get(1).filter(|p| watched(p)) {
                changes.push(ChangeEvent::Created(new.clone()));
            }
            changes
        }

        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .filter(|p| watched(p))
            .map(|p| ChangeEvent::Removed(p.clone()))
            .collect(),

        EventKind::Modify(_) => event
            .paths
            .iter()
            .filter(|p| watched(p))
            .map(|p| ChangeEvent::Modified(p.clone()))
            .collect(),

        _ => Vec::new(),
    };

    if changes.is_empty() {
        trace!(kind = ?event.kind, "Ignoring event");
    } else {
        debug!(kind = ?event.kind, changes = changes.len(), "Mapped watcher event");
    }
    changes
}

/// Queue that coalesces rapid filesystem changes into settled batches
///
/// When multiple events arrive for the same path in quick succession, only
/// the latest event is kept and its timestamp is reset. Events are only
/// emitted by [`poll`](DebouncedChangeQueue::poll) once they have been quiet
/// for longer than the stabilization threshold.
///
/// Timestamps come from the tokio clock so a paused test runtime controls
/// settling.
pub struct DebouncedChangeQueue {
    /// Pending changes keyed by path, storing the latest event and its timestamp
    pending: HashMap<PathBuf, (ChangeEvent, Instant)>,
    stability_threshold: Duration,
}

impl DebouncedChangeQueue {
    pub fn new(stability_threshold: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            stability_threshold,
        }
    }

    /// Inserts or replaces the pending change for the event's path
    pub fn push(&mut self, event: ChangeEvent) {
        let path = event.path().to_path_buf();
        trace!(path = %path.display(), event = ?event, "Enqueuing change event");
        self.pending.insert(path, (event, Instant::now()));
    }

    /// Removes and returns every change that has been quiet long enough
    ///
    /// The batch is sorted by path.
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let threshold = self.stability_threshold;
        let settled_paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, timestamp))| now.duration_since(*timestamp) >= threshold)
            .map(|(path, _)| path.clone())
            .collect();

        let mut settled: Vec<ChangeEvent> = settled_paths
            .iter()
            .filter_map(|path| self.pending.remove(path))
            .map(|(event, _)| event)
            .collect();
        settled.sort_by(|a, b| a.path().cmp(b.path()));

        if !settled.is_empty() {
            debug!(count = settled.len(), "Polled settled change events");
        }
        settled
    }

    /// Returns the number of pending (unsettled) events
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
