//! Watch loop
//!
//! Re-runs the upload/deploy workflow whenever the manifest's local files
//! change. The loop owns the [`RunStatus`] and the [`FileTracker`], so
//! invocations are strictly sequential: changes that arrive while a cycle
//! runs wait in the channel and land in the next batch.
//!
//! Each cycle:
//! 1. resets the run status (a new logical invocation),
//! 2. runs the workflow with the retained tracker, so only files whose
//!    modification time moved are uploaded again,
//! 3. adopts the handles of the now-live configuration.
//!
//! A failed cycle is reported and the loop keeps watching.

use std::sync::Arc;
use std::time::Duration;

use kcustomize_core::config::WatchConfig;
use kcustomize_core::domain::{CustomizeError, CustomizeManifest, FileTracker};
use kcustomize_core::ports::{ICustomizeClient, IWorkflowObserver, NoopObserver, WorkflowEvent};
use kcustomize_core::usecases::{RunStatus, UploadDeployUseCase};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::watcher::{ChangeEvent, DebouncedChangeQueue};

/// Lower bound of the queue check period; a zero period is rejected by tokio
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchSettings {
    /// How long a file must stay quiet before its change is acted upon
    pub stability_threshold: Duration,
    /// How often the change queue is checked
    pub poll_interval: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            stability_threshold: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl From<&WatchConfig> for WatchSettings {
    fn from(config: &WatchConfig) -> Self {
        Self {
            stability_threshold: Duration::from_millis(config.stability_threshold_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms).max(MIN_POLL_INTERVAL),
        }
    }
}

/// Drives upload/deploy cycles from settled file changes
pub struct WatchLoop {
    client: Arc<dyn ICustomizeClient>,
    observer: Arc<dyn IWorkflowObserver>,
    cancel: CancellationToken,
    settings: WatchSettings,
    manifest: CustomizeManifest,
    tracker: FileTracker,
    status: RunStatus,
}

impl WatchLoop {
    /// Creates a loop continuing from the tracker of the initial invocation
    pub fn new(
        client: Arc<dyn ICustomizeClient>,
        manifest: CustomizeManifest,
        tracker: FileTracker,
    ) -> Self {
        Self {
            client,
            observer: Arc::new(NoopObserver),
            cancel: CancellationToken::new(),
            settings: WatchSettings::default(),
            manifest,
            tracker,
            status: RunStatus::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn IWorkflowObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the token that stops the loop and any in-flight deployment poll
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_settings(mut self, settings: WatchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn tracker(&self) -> &FileTracker {
        &self.tracker
    }

    /// Adopts the file keys of the live configuration into the tracker
    ///
    /// A failed fetch only costs extra uploads later, so it is logged and
    /// otherwise ignored.
    pub async fn refresh_handles(&mut self) {
        match self.client.fetch_configuration(&self.manifest.app).await {
            Ok(remote) => {
                let adopted = self.tracker.merge_remote(&remote);
                debug!(app = %self.manifest.app, adopted, "Refreshed handles from live configuration");
            }
            Err(err) => {
                warn!(app = %self.manifest.app, error = %err, "Failed to fetch customize setting");
            }
        }
    }

    /// Runs one logical invocation with the retained tracker
    pub async fn run_cycle(&mut self) -> Result<(), CustomizeError> {
        self.status.reset();
        let use_case = UploadDeployUseCase::new(Arc::clone(&self.client))
            .with_observer(Arc::clone(&self.observer))
            .with_cancellation(self.cancel.clone());

        let tracker = use_case
            .run(&self.manifest, &mut self.status, Some(&self.tracker))
            .await?;
        self.tracker = tracker;
        self.refresh_handles().await;
        Ok(())
    }

    /// Watches until cancelled or until the event channel closes
    ///
    /// Returns the final tracker.
    pub async fn run(mut self, mut events: mpsc::Receiver<ChangeEvent>) -> FileTracker {
        let mut queue = DebouncedChangeQueue::new(self.settings.stability_threshold);
        let mut ticker = tokio::time::interval(self.settings.poll_interval.max(MIN_POLL_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.refresh_handles().await;
        self.observer.on_event(&WorkflowEvent::Watching);
        info!(app = %self.manifest.app, "Watching for file changes");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!("Watch loop cancelled");
                    break;
                }

                received = events.recv() => match received {
                    Some(event) => queue.push(event),
                    None => {
                        info!("File watcher closed, stopping watch loop");
                        break;
                    }
                },

                _ = ticker.tick() => {
                    let batch = queue.poll();
                    if batch.is_empty() {
                        continue;
                    }

                    let paths = batch.iter().map(|e| e.path().to_path_buf()).collect();
                    info!(changes = batch.len(), "Detected settled changes");
                    self.observer.on_event(&WorkflowEvent::ChangesDetected { paths });

                    match self.run_cycle().await {
                        Ok(()) => info!(app = %self.manifest.app, "Watch cycle complete"),
                        Err(CustomizeError::Cancelled) => {
                            info!("Watch cycle cancelled");
                            break;
                        }
                        Err(err) => {
                            error!(app = %self.manifest.app, error = %err, "Watch cycle failed");
                            self.observer.on_event(&WorkflowEvent::CycleFailed { error: err });
                        }
                    }
                }
            }
        }

        self.tracker
    }
}
