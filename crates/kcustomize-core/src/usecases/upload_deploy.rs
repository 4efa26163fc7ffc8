//! Upload/deploy use case
//!
//! Runs one logical invocation of the customize workflow:
//!
//! 1. **Resolve**: every manifest entry becomes a customize entry. URLs pass
//!    through, unchanged local files reuse their cached handle, the rest are
//!    uploaded. All entries resolve concurrently; output order mirrors the
//!    manifest.
//! 2. **Apply**: the built payload replaces the app's preview setting.
//! 3. **Deploy**: deployment is triggered and polled until it finishes.
//!
//! A failed attempt is retried from the top, but a [`RunStatus`] carried
//! across attempts lets a retry skip stages that already succeeded: the
//! payload is built once and applied once.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{
    CustomizeEntry, CustomizeError, CustomizeManifest, CustomizeSetting, FileGroup, FileIdentity,
    FileKey, FileReference, FileTracker,
};
use crate::ports::{ICustomizeClient, IWorkflowObserver, NoopObserver, WorkflowEvent};

/// Maximum number of attempts for one logical invocation
pub const MAX_RETRY_COUNT: u32 = 3;

/// Delay before a failed attempt is retried
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Delay between two deployment status checks
const DEPLOY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Progress of one logical invocation, carried across its attempts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatus {
    /// Number of failed attempts so far
    pub retry_count: u32,
    /// Payload built by the first successful resolve stage
    pub update_body: Option<CustomizeSetting>,
    /// True once the payload has been applied
    pub updated: bool,
}

impl RunStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new logical invocation
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One resolved manifest entry
struct Resolved {
    identity: FileIdentity,
    entry: CustomizeEntry,
    /// Handle of a fresh upload and the mtime observed before it
    uploaded: Option<(FileKey, i64)>,
}

/// Use case for uploading, applying and deploying a customization
pub struct UploadDeployUseCase {
    client: Arc<dyn ICustomizeClient>,
    observer: Arc<dyn IWorkflowObserver>,
    cancel: CancellationToken,
    retry_delay: Duration,
    poll_interval: Duration,
}

impl UploadDeployUseCase {
    /// Creates a use case with a silent observer and no external cancellation
    pub fn new(client: Arc<dyn ICustomizeClient>) -> Self {
        Self {
            client,
            observer: Arc::new(NoopObserver),
            cancel: CancellationToken::new(),
            retry_delay: RETRY_DELAY,
            poll_interval: DEPLOY_POLL_INTERVAL,
        }
    }

    /// Sets the observer receiving progress events
    pub fn with_observer(mut self, observer: Arc<dyn IWorkflowObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the token that aborts retry delays and deployment polling
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs one logical invocation
    ///
    /// # Arguments
    ///
    /// * `manifest` - The customization to upload
    /// * `status` - Progress of this invocation; pass a fresh or reset one
    /// * `tracker` - Tracker from a previous invocation, `None` on the first
    ///
    /// # Returns
    ///
    /// The tracker updated with this invocation's uploads
    ///
    /// # Errors
    ///
    /// - [`CustomizeError::Authentication`] immediately, without retrying
    /// - [`CustomizeError::Filesystem`], [`CustomizeError::State`] and
    ///   [`CustomizeError::Cancelled`] immediately
    /// - the last network/remote error once [`MAX_RETRY_COUNT`] attempts failed
    pub async fn run(
        &self,
        manifest: &CustomizeManifest,
        status: &mut RunStatus,
        tracker: Option<&FileTracker>,
    ) -> Result<FileTracker, CustomizeError> {
        let mut tracker = match tracker {
            Some(tracker) => tracker.clone(),
            None => FileTracker::initialize(manifest)?,
        };

        loop {
            let err = match self.attempt(manifest, status, &mut tracker).await {
                Ok(()) => return Ok(tracker),
                Err(err) => err,
            };

            status.retry_count += 1;

            if err.is_authentication() {
                warn!(app = %manifest.app, "Credentials rejected, not retrying");
                return Err(err);
            }
            if !err.is_retryable() {
                error!(app = %manifest.app, error = %err, "Workflow failed");
                return Err(err);
            }
            if status.retry_count >= MAX_RETRY_COUNT {
                error!(
                    app = %manifest.app,
                    attempts = status.retry_count,
                    error = %err,
                    "Retry budget exhausted"
                );
                return Err(err);
            }

            warn!(
                app = %manifest.app,
                attempt = status.retry_count,
                error = %err,
                "Attempt failed, retrying"
            );
            self.cancellable(async {
                tokio::time::sleep(self.retry_delay).await;
                Ok(())
            })
            .await?;
            self.observer.on_event(&WorkflowEvent::Retrying {
                attempt: status.retry_count,
            });
        }
    }

    /// One pass through the stages that have not completed yet
    async fn attempt(
        &self,
        manifest: &CustomizeManifest,
        status: &mut RunStatus,
        tracker: &mut FileTracker,
    ) -> Result<(), CustomizeError> {
        if status.update_body.is_none() {
            self.observer.on_event(&WorkflowEvent::UploadStarted);
            match self.resolve(manifest, tracker).await {
                Ok(setting) => {
                    self.observer.on_event(&WorkflowEvent::FilesUploaded);
                    status.update_body = Some(setting);
                }
                Err(err) => {
                    self.observer.on_event(&WorkflowEvent::UploadFailed);
                    return Err(err);
                }
            }
        }

        if !status.updated {
            let body = status.update_body.as_ref().ok_or_else(|| {
                CustomizeError::State("apply stage reached without a payload".to_string())
            })?;
            if let Err(err) = self.client.replace_configuration(body).await {
                self.observer.on_event(&WorkflowEvent::UpdateFailed);
                return Err(err);
            }
            info!(app = %manifest.app, "Customize setting updated");
            self.observer.on_event(&WorkflowEvent::SettingUpdated);
            status.updated = true;
        }

        match self.deploy(&manifest.app).await {
            Ok(()) => {
                info!(app = %manifest.app, "Customize setting deployed");
                self.observer.on_event(&WorkflowEvent::Deployed);
                Ok(())
            }
            Err(err) => {
                self.observer.on_event(&WorkflowEvent::DeployFailed);
                Err(err)
            }
        }
    }

    /// Resolves every group and builds the payload
    ///
    /// The tracker is only written once every entry resolved, so a failed
    /// stage adopts none of its uploads.
    async fn resolve(
        &self,
        manifest: &CustomizeManifest,
        tracker: &mut FileTracker,
    ) -> Result<CustomizeSetting, CustomizeError> {
        let snapshot: &FileTracker = tracker;
        let (desktop_js, desktop_css, mobile_js) = tokio::try_join!(
            self.resolve_group(manifest, FileGroup::DesktopJs, snapshot),
            self.resolve_group(manifest, FileGroup::DesktopCss, snapshot),
            self.resolve_group(manifest, FileGroup::MobileJs, snapshot),
        )?;

        let mut uploads = 0usize;
        for resolved in desktop_js.iter().chain(&desktop_css).chain(&mobile_js) {
            if let Some((file_key, observed)) = &resolved.uploaded {
                tracker.record_upload(&resolved.identity, file_key.clone(), *observed)?;
                uploads += 1;
            }
        }
        debug!(app = %manifest.app, uploads, "Resolve stage complete");

        let entries = |group: Vec<Resolved>| -> Vec<CustomizeEntry> {
            group.into_iter().map(|r| r.entry).collect()
        };
        Ok(CustomizeSetting::from_resolved(
            manifest,
            entries(desktop_js),
            entries(desktop_css),
            entries(mobile_js),
        ))
    }

    async fn resolve_group(
        &self,
        manifest: &CustomizeManifest,
        group: FileGroup,
        tracker: &FileTracker,
    ) -> Result<Vec<Resolved>, CustomizeError> {
        let pending = manifest
            .group(group)
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                self.resolve_entry(group.identity(index), FileReference::parse(entry), tracker)
            });
        try_join_all(pending).await
    }

    async fn resolve_entry(
        &self,
        identity: FileIdentity,
        reference: FileReference,
        tracker: &FileTracker,
    ) -> Result<Resolved, CustomizeError> {
        let path: PathBuf = match reference {
            FileReference::Url(url) => {
                return Ok(Resolved {
                    identity,
                    entry: CustomizeEntry::url(url),
                    uploaded: None,
                });
            }
            FileReference::Local(path) => path,
        };

        if tracker.can_skip(&identity) {
            let file_key = tracker.handle(&identity)?;
            debug!(%identity, path = %path.display(), "Unchanged, reusing handle");
            self.observer
                .on_event(&WorkflowEvent::FileSkipped { identity });
            return Ok(Resolved {
                identity,
                entry: CustomizeEntry::file(file_key),
                uploaded: None,
            });
        }

        // Stat before the content is read so a save during the upload is
        // still seen as a change afterwards
        let observed = tracker.observe(&identity)?;
        let file_key = self.client.upload_file(&path, identity.kind).await?;
        debug!(%identity, path = %path.display(), file_key = %file_key, "Uploaded");
        self.observer
            .on_event(&WorkflowEvent::FileUploaded { path });
        Ok(Resolved {
            identity,
            entry: CustomizeEntry::file(file_key.clone()),
            uploaded: Some((file_key, observed)),
        })
    }

    /// Triggers deployment and waits until it reaches a terminal status
    async fn deploy(&self, app: &str) -> Result<(), CustomizeError> {
        self.client.trigger_deployment(app).await?;

        loop {
            let status = self
                .cancellable(self.client.poll_deployment_status(app))
                .await?;
            if status.done {
                return Ok(());
            }
            self.cancellable(async {
                tokio::time::sleep(self.poll_interval).await;
                Ok(())
            })
            .await?;
            self.observer.on_event(&WorkflowEvent::Deploying);
        }
    }

    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, CustomizeError>>,
    ) -> Result<T, CustomizeError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CustomizeError::Cancelled),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::domain::{ContentKind, DeployStatus, RemoteCustomize};
    use tempfile::TempDir;

    /// Scripted in-memory client
    #[derive(Default)]
    struct MockClient {
        uploads: Mutex<Vec<PathBuf>>,
        upload_failures: Mutex<HashMap<PathBuf, VecDeque<CustomizeError>>>,
        upload_delays: HashMap<PathBuf, Duration>,
        replaced: Mutex<Vec<CustomizeSetting>>,
        replace_failures: Mutex<VecDeque<CustomizeError>>,
        deploys: AtomicU32,
        deploy_failures: Mutex<VecDeque<CustomizeError>>,
        polls: AtomicU32,
        /// Statuses returned by successive polls; done once exhausted
        poll_script: Mutex<VecDeque<bool>>,
        never_done: bool,
        /// File saved again while its first upload is in flight
        edit_during_upload: Mutex<Option<PathBuf>>,
    }

    impl MockClient {
        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }

        fn replace_count(&self) -> usize {
            self.replaced.lock().unwrap().len()
        }

        fn fail_upload(&self, path: &Path, err: CustomizeError) {
            self.upload_failures
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_default()
                .push_back(err);
        }

        fn fail_deploys(&self, errors: impl IntoIterator<Item = CustomizeError>) {
            self.deploy_failures.lock().unwrap().extend(errors);
        }
    }

    #[async_trait::async_trait]
    impl ICustomizeClient for MockClient {
        async fn upload_file(
            &self,
            path: &Path,
            _kind: ContentKind,
        ) -> Result<FileKey, CustomizeError> {
            if let Some(delay) = self.upload_delays.get(path) {
                tokio::time::sleep(*delay).await;
            }
            let edit = {
                let mut pending = self.edit_during_upload.lock().unwrap();
                if pending.as_deref() == Some(path) {
                    pending.take()
                } else {
                    None
                }
            };
            if let Some(edited) = edit {
                std::fs::write(&edited, "/* version 2 */").unwrap();
                let later = filetime::FileTime::from_unix_time(2_000_000_000, 0);
                filetime::set_file_mtime(&edited, later).unwrap();
            }
            let n = {
                let mut uploads = self.uploads.lock().unwrap();
                uploads.push(path.to_path_buf());
                uploads.len()
            };
            let failure = self
                .upload_failures
                .lock()
                .unwrap()
                .get_mut(path)
                .and_then(|queue| queue.pop_front());
            if let Some(err) = failure {
                return Err(err);
            }
            if !path.exists() {
                return Err(CustomizeError::Filesystem {
                    path: path.to_path_buf(),
                    reason: "not found".to_string(),
                });
            }
            let name = path.file_name().unwrap().to_string_lossy();
            Ok(FileKey::new(format!("key-{n}-{name}")))
        }

        async fn replace_configuration(
            &self,
            setting: &CustomizeSetting,
        ) -> Result<(), CustomizeError> {
            self.replaced.lock().unwrap().push(setting.clone());
            match self.replace_failures.lock().unwrap().pop_front() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn trigger_deployment(&self, _app: &str) -> Result<(), CustomizeError> {
            self.deploys.fetch_add(1, Ordering::SeqCst);
            match self.deploy_failures.lock().unwrap().pop_front() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn poll_deployment_status(&self, _app: &str) -> Result<DeployStatus, CustomizeError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.never_done {
                return Ok(DeployStatus { done: false });
            }
            let done = self.poll_script.lock().unwrap().pop_front().unwrap_or(true);
            Ok(DeployStatus { done })
        }

        async fn fetch_configuration(&self, _app: &str) -> Result<RemoteCustomize, CustomizeError> {
            Err(CustomizeError::State("not scripted".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<WorkflowEvent>>,
    }

    impl RecordingObserver {
        fn count(&self, event: &WorkflowEvent) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| *e == event)
                .count()
        }
    }

    impl IWorkflowObserver for RecordingObserver {
        fn on_event(&self, event: &WorkflowEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn write_file(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, format!("/* {name} */")).unwrap();
        path
    }

    fn manifest(
        desktop_js: Vec<String>,
        desktop_css: Vec<String>,
        mobile_js: Vec<String>,
    ) -> CustomizeManifest {
        let value = serde_json::json!({
            "app": "42",
            "scope": "ALL",
            "desktop": { "js": desktop_js, "css": desktop_css },
            "mobile": { "js": mobile_js },
        });
        serde_json::from_value(value).unwrap()
    }

    fn s(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    fn use_case(client: &Arc<MockClient>) -> UploadDeployUseCase {
        UploadDeployUseCase::new(client.clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_uploads_applies_and_deploys() {
        let dir = TempDir::new().unwrap();
        let app_js = write_file(&dir, "app.js");
        let app_css = write_file(&dir, "app.css");
        let mobile_js = write_file(&dir, "mobile.js");
        let manifest = manifest(
            vec!["https://cdn.example.com/lib.js".into(), s(&app_js)],
            vec![s(&app_css)],
            vec![s(&mobile_js)],
        );

        let client = Arc::new(MockClient::default());
        let observer = Arc::new(RecordingObserver::default());
        let workflow = use_case(&client).with_observer(observer.clone());
        let mut status = RunStatus::new();

        let tracker = workflow.run(&manifest, &mut status, None).await.unwrap();

        assert_eq!(client.upload_count(), 3);
        assert_eq!(client.replace_count(), 1);
        assert_eq!(client.deploys.load(Ordering::SeqCst), 1);
        assert_eq!(client.polls.load(Ordering::SeqCst), 1);
        assert!(status.updated);
        assert_eq!(status.retry_count, 0);

        let body = &client.replaced.lock().unwrap()[0];
        assert_eq!(body.app, "42");
        assert_eq!(body.desktop.js[0], CustomizeEntry::url("https://cdn.example.com/lib.js"));
        assert!(body.desktop.js[1].file_key().is_some());
        assert!(body.mobile.js[0].file_key().is_some());

        for group in FileGroup::ALL {
            for index in 0..manifest.group(group).len() {
                assert!(tracker.can_skip(&group.identity(index)));
            }
        }
        assert_eq!(observer.count(&WorkflowEvent::Deployed), 1);
        assert_eq!(observer.count(&WorkflowEvent::FilesUploaded), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_url_entries_are_never_uploaded() {
        let manifest = manifest(
            vec!["https://cdn.example.com/a.js".into()],
            vec!["http://cdn.example.com/a.css".into()],
            vec![],
        );
        let client = Arc::new(MockClient::default());
        let mut status = RunStatus::new();

        use_case(&client).run(&manifest, &mut status, None).await.unwrap();

        assert_eq!(client.upload_count(), 0);
        let body = &client.replaced.lock().unwrap()[0];
        assert_eq!(body.desktop.css[0], CustomizeEntry::url("http://cdn.example.com/a.css"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_order_mirrors_manifest_under_concurrency() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        let b = write_file(&dir, "b.js");
        let c = write_file(&dir, "c.js");
        let manifest = manifest(vec![s(&a), s(&b), s(&c)], vec![], vec![]);

        let mut client = MockClient::default();
        client.upload_delays.insert(a.clone(), Duration::from_millis(300));
        client.upload_delays.insert(b.clone(), Duration::from_millis(100));
        client.upload_delays.insert(c.clone(), Duration::from_millis(200));
        let client = Arc::new(client);
        let mut status = RunStatus::new();

        use_case(&client).run(&manifest, &mut status, None).await.unwrap();

        // Uploads finish b, c, a but the payload keeps manifest order
        let uploads = client.uploads.lock().unwrap().clone();
        assert_eq!(uploads, vec![b.clone(), c.clone(), a.clone()]);
        let body = &client.replaced.lock().unwrap()[0];
        let keys: Vec<&str> = body
            .desktop
            .js
            .iter()
            .map(|e| e.file_key().unwrap().as_str())
            .collect();
        assert!(keys[0].ends_with("a.js"));
        assert!(keys[1].ends_with("b.js"));
        assert!(keys[2].ends_with("c.js"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_files_reuse_cached_handles() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        let b = write_file(&dir, "b.css");
        let manifest = manifest(vec![s(&a)], vec![s(&b)], vec![]);
        let client = Arc::new(MockClient::default());
        let workflow = use_case(&client);

        let mut status = RunStatus::new();
        let tracker = workflow.run(&manifest, &mut status, None).await.unwrap();
        assert_eq!(client.upload_count(), 2);

        status.reset();
        let tracker = workflow
            .run(&manifest, &mut status, Some(&tracker))
            .await
            .unwrap();
        assert_eq!(client.upload_count(), 2);
        {
            let replaced = client.replaced.lock().unwrap();
            assert_eq!(replaced.len(), 2);
            assert_eq!(replaced[0], replaced[1]);
        }

        // Touch one file: only that one is uploaded again
        let later = filetime::FileTime::from_unix_time(2_000_000_000, 0);
        filetime::set_file_mtime(&a, later).unwrap();
        status.reset();
        workflow
            .run(&manifest, &mut status, Some(&tracker))
            .await
            .unwrap();
        let uploads = client.uploads.lock().unwrap().clone();
        assert_eq!(uploads.len(), 3);
        assert_eq!(uploads[2], a);
    }

    #[tokio::test(start_paused = true)]
    async fn test_applied_status_skips_replace_on_retry() {
        let client = Arc::new(MockClient::default());
        client.fail_deploys([CustomizeError::Network("reset".into())]);
        let manifest = manifest(vec!["https://cdn.example.com/a.js".into()], vec![], vec![]);
        let body = CustomizeSetting::from_resolved(
            &manifest,
            vec![CustomizeEntry::url("https://cdn.example.com/a.js")],
            vec![],
            vec![],
        );
        let mut status = RunStatus {
            retry_count: 0,
            update_body: Some(body),
            updated: true,
        };

        use_case(&client).run(&manifest, &mut status, None).await.unwrap();

        assert_eq!(client.replace_count(), 0);
        assert_eq!(client.deploys.load(Ordering::SeqCst), 2);
        assert_eq!(status.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deploy_failure_resumes_without_reuploading() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        let manifest = manifest(vec![s(&a)], vec![], vec![]);
        let client = Arc::new(MockClient::default());
        client.fail_deploys([CustomizeError::Remote {
            status: 500,
            message: "busy".into(),
        }]);
        let observer = Arc::new(RecordingObserver::default());
        let mut status = RunStatus::new();

        use_case(&client)
            .with_observer(observer.clone())
            .run(&manifest, &mut status, None)
            .await
            .unwrap();

        assert_eq!(client.upload_count(), 1);
        assert_eq!(client.replace_count(), 1);
        assert_eq!(client.deploys.load(Ordering::SeqCst), 2);
        assert_eq!(observer.count(&WorkflowEvent::DeployFailed), 1);
        assert_eq!(observer.count(&WorkflowEvent::Retrying { attempt: 1 }), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_bounded() {
        let manifest = manifest(vec!["https://cdn.example.com/a.js".into()], vec![], vec![]);
        let client = Arc::new(MockClient::default());
        client.fail_deploys((0..5).map(|i| CustomizeError::Network(format!("attempt {i}"))));
        let mut status = RunStatus::new();
        let start = tokio::time::Instant::now();

        let err = use_case(&client)
            .run(&manifest, &mut status, None)
            .await
            .unwrap_err();

        assert_eq!(err, CustomizeError::Network("attempt 2".into()));
        assert_eq!(client.deploys.load(Ordering::SeqCst), MAX_RETRY_COUNT);
        assert_eq!(status.retry_count, MAX_RETRY_COUNT);
        assert_eq!(client.replace_count(), 1);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        let manifest = manifest(vec![s(&a)], vec![], vec![]);
        let client = Arc::new(MockClient::default());
        client.fail_upload(&a, CustomizeError::Authentication("CB_WA01".into()));
        let observer = Arc::new(RecordingObserver::default());
        let mut status = RunStatus::new();

        let err = use_case(&client)
            .with_observer(observer.clone())
            .run(&manifest, &mut status, None)
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(client.upload_count(), 1);
        assert_eq!(client.replace_count(), 0);
        assert_eq!(status.retry_count, 1);
        assert!(status.update_body.is_none());
        assert_eq!(observer.count(&WorkflowEvent::UploadFailed), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_resolve_adopts_no_uploads() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        let b = write_file(&dir, "b.js");
        let manifest = manifest(vec![s(&a), s(&b)], vec![], vec![]);
        let mut client = MockClient::default();
        // a finishes before b fails
        client.upload_delays.insert(b.clone(), Duration::from_millis(50));
        let client = Arc::new(client);
        client.fail_upload(&b, CustomizeError::Network("timeout".into()));
        let mut status = RunStatus::new();

        let tracker = use_case(&client)
            .run(&manifest, &mut status, None)
            .await
            .unwrap();

        // Both files are uploaded again on the retry
        assert_eq!(client.upload_count(), 4);
        assert_eq!(status.retry_count, 1);
        let body = &client.replaced.lock().unwrap()[0];
        assert_eq!(body.desktop.js[0].file_key().unwrap().as_str(), "key-3-a.js");
        assert!(tracker.can_skip(&FileGroup::DesktopJs.identity(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_filesystem_error_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        let manifest = manifest(vec![s(&a)], vec![], vec![]);
        let tracker = FileTracker::initialize(&manifest).unwrap();
        std::fs::remove_file(&a).unwrap();
        let client = Arc::new(MockClient::default());
        let mut status = RunStatus::new();

        let err = use_case(&client)
            .run(&manifest, &mut status, Some(&tracker))
            .await
            .unwrap_err();

        assert!(matches!(err, CustomizeError::Filesystem { .. }));
        assert_eq!(client.upload_count(), 0);
        assert_eq!(status.retry_count, 1);

        // Same for a read failure reported by the client itself
        write_file(&dir, "a.js");
        client.fail_upload(
            &a,
            CustomizeError::Filesystem {
                path: a.clone(),
                reason: "permission denied".to_string(),
            },
        );
        let mut status = RunStatus::new();
        let err = use_case(&client)
            .run(&manifest, &mut status, Some(&tracker))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomizeError::Filesystem { .. }));
        assert_eq!(client.upload_count(), 1);
        assert_eq!(status.retry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_during_upload_is_uploaded_next_run() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.js");
        filetime::set_file_mtime(&a, filetime::FileTime::from_unix_time(1_600_000_000, 0))
            .unwrap();
        let manifest = manifest(vec![s(&a)], vec![], vec![]);
        let client = MockClient::default();
        *client.edit_during_upload.lock().unwrap() = Some(a.clone());
        let client = Arc::new(client);
        let workflow = use_case(&client);

        let mut status = RunStatus::new();
        let tracker = workflow.run(&manifest, &mut status, None).await.unwrap();
        assert_eq!(client.upload_count(), 1);
        assert!(!tracker.can_skip(&FileGroup::DesktopJs.identity(0)));

        status.reset();
        let tracker = workflow
            .run(&manifest, &mut status, Some(&tracker))
            .await
            .unwrap();
        assert_eq!(client.upload_count(), 2);
        assert!(tracker.can_skip(&FileGroup::DesktopJs.identity(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_file_fails_before_any_upload() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.js");
        let manifest = manifest(vec![s(&missing)], vec![], vec![]);
        let client = Arc::new(MockClient::default());
        let mut status = RunStatus::new();

        let err = use_case(&client)
            .run(&manifest, &mut status, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CustomizeError::Filesystem { .. }));
        assert_eq!(client.upload_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_deployment_finishes() {
        let manifest = manifest(vec!["https://cdn.example.com/a.js".into()], vec![], vec![]);
        let client = Arc::new(MockClient::default());
        client.poll_script.lock().unwrap().extend([false, false, true]);
        let observer = Arc::new(RecordingObserver::default());
        let mut status = RunStatus::new();
        let start = tokio::time::Instant::now();

        use_case(&client)
            .with_observer(observer.clone())
            .run(&manifest, &mut status, None)
            .await
            .unwrap();

        assert_eq!(client.polls.load(Ordering::SeqCst), 3);
        assert_eq!(observer.count(&WorkflowEvent::Deploying), 2);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let manifest = manifest(vec!["https://cdn.example.com/a.js".into()], vec![], vec![]);
        let client = Arc::new(MockClient {
            never_done: true,
            ..Default::default()
        });
        let cancel = CancellationToken::new();
        let workflow = use_case(&client).with_cancellation(cancel.clone());
        let mut status = RunStatus::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = workflow.run(&manifest, &mut status, None).await.unwrap_err();

        assert_eq!(err, CustomizeError::Cancelled);
        let polls = client.polls.load(Ordering::SeqCst);
        assert!((5..=7).contains(&polls), "polls = {polls}");
    }

    #[test]
    fn test_run_status_reset() {
        let mut status = RunStatus {
            retry_count: 2,
            update_body: None,
            updated: true,
        };
        status.reset();
        assert_eq!(status, RunStatus::new());
    }
}
