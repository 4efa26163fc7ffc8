//! Upload command - Upload, apply and deploy a customization
//!
//! Provides the `upload` CLI command which:
//! 1. Loads the manifest and resolves connection parameters
//! 2. Creates the kintone adapter and the progress observer
//! 3. Runs the upload/update/deploy workflow
//! 4. With `--watch`, re-runs the workflow whenever a referenced file settles

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use kcustomize_api::{KintoneClient, KintoneCustomizeClient};
use kcustomize_core::domain::{CustomizeError, CustomizeManifest};
use kcustomize_core::messages::{get_message, Lang, MessageKey};
use kcustomize_core::ports::ICustomizeClient;
use kcustomize_core::usecases::{RunStatus, UploadDeployUseCase};
use kcustomize_sync::{FileWatcher, WatchLoop, WatchSettings};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::output::{get_formatter, ProgressObserver};
use crate::params::{resolve_connection, resolve_lang, ConnectionArgs, DialoguerPrompter};
use crate::GlobalOptions;

/// Upload command with clap options
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Path to the customize manifest (JSON)
    pub manifest: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Message language: en or ja
    #[arg(long)]
    pub lang: Option<Lang>,

    /// Keep running and re-deploy when a referenced file changes
    #[arg(long)]
    pub watch: bool,
}

impl UploadCommand {
    pub async fn execute(&self, globals: &GlobalOptions) -> Result<()> {
        let locale = std::env::var("LANG").ok();
        let lang = resolve_lang(self.lang, globals.config.lang, locale.as_deref());

        let Some(manifest_path) = &self.manifest else {
            anyhow::bail!(get_message(lang, MessageKey::ManifestRequired));
        };
        let manifest = CustomizeManifest::load(manifest_path)?;
        info!(manifest = %manifest_path.display(), app = %manifest.app, "Loaded manifest");

        let params = resolve_connection(&self.connection, &globals.config, lang, &DialoguerPrompter)?;
        let client = KintoneClient::new(&params.domain, params.credentials, params.options)
            .context("Failed to create kintone client")?;
        let client: Arc<dyn ICustomizeClient> = Arc::new(KintoneCustomizeClient::new(client));
        let observer = Arc::new(ProgressObserver::new(lang, globals.format, globals.quiet));

        let cancel = CancellationToken::new();
        spawn_interrupt_handler(cancel.clone());

        let use_case = UploadDeployUseCase::new(Arc::clone(&client))
            .with_observer(observer.clone())
            .with_cancellation(cancel.clone());
        let mut status = RunStatus::new();
        let tracker = use_case
            .run(&manifest, &mut status, None)
            .await
            .map_err(|e| workflow_error(e, lang))?;

        if !self.watch {
            return Ok(());
        }

        let paths = manifest.local_paths();
        if paths.is_empty() {
            get_formatter(false).warn("Manifest references no local files; nothing to watch");
            return Ok(());
        }

        // The watcher must outlive the loop; dropping it closes the channel
        let (watcher, events) = FileWatcher::new(&paths).context("Failed to start file watcher")?;
        info!(files = watcher.watched_count(), "Started file watcher");

        let watch_loop = WatchLoop::new(client, manifest, tracker)
            .with_observer(observer)
            .with_cancellation(cancel)
            .with_settings(WatchSettings::from(&globals.config.watch));
        watch_loop.run(events).await;
        drop(watcher);

        Ok(())
    }
}

/// Cancels `cancel` on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}

/// Maps a workflow failure to the message shown to the user
fn workflow_error(err: CustomizeError, lang: Lang) -> anyhow::Error {
    match err {
        CustomizeError::Authentication(_) => {
            anyhow::anyhow!(get_message(lang, MessageKey::AuthenticationFailed))
        }
        other => anyhow::Error::new(other),
    }
}
