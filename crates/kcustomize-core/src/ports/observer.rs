//! Workflow observer port
//!
//! The upload/deploy workflow reports each stage transition as a
//! [`WorkflowEvent`]. Observers are fire-and-forget: nothing they do
//! affects the workflow's behavior.

use std::path::PathBuf;

use crate::domain::errors::CustomizeError;
use crate::domain::manifest::FileIdentity;
use crate::messages::{get_message, Lang, MessageKey};

/// A progress event emitted by the upload/deploy workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// The resolve stage started
    UploadStarted,
    /// A local file was uploaded
    FileUploaded { path: PathBuf },
    /// A local file was unchanged and its cached handle reused
    FileSkipped { identity: FileIdentity },
    /// Every entry was resolved
    FilesUploaded,
    UploadFailed,
    SettingUpdated,
    UpdateFailed,
    /// A deployment poll found the deployment still running
    Deploying,
    Deployed,
    DeployFailed,
    /// A failed attempt is about to be retried
    Retrying { attempt: u32 },
    /// The watch loop is waiting for file changes
    Watching,
    /// Settled changes are about to trigger a new invocation
    ChangesDetected { paths: Vec<PathBuf> },
    /// A watch cycle failed; the loop keeps running
    CycleFailed { error: CustomizeError },
}

impl WorkflowEvent {
    /// Localized text for the event, `None` for events that are only logged
    pub fn message(&self, lang: Lang) -> Option<String> {
        let key = match self {
            WorkflowEvent::UploadStarted => MessageKey::StartUploading,
            WorkflowEvent::FileUploaded { path } => {
                return Some(format!(
                    "{} {}",
                    path.display(),
                    get_message(lang, MessageKey::HasUploaded)
                ));
            }
            WorkflowEvent::FileSkipped { .. } => return None,
            WorkflowEvent::FilesUploaded => MessageKey::FilesUploaded,
            WorkflowEvent::UploadFailed => MessageKey::UploadFailed,
            WorkflowEvent::SettingUpdated => MessageKey::SettingUpdated,
            WorkflowEvent::UpdateFailed => MessageKey::UpdateFailed,
            WorkflowEvent::Deploying => MessageKey::WaitDeploying,
            WorkflowEvent::Deployed => MessageKey::Deployed,
            WorkflowEvent::DeployFailed => MessageKey::DeployFailed,
            WorkflowEvent::Retrying { .. } => MessageKey::Retrying,
            WorkflowEvent::Watching => MessageKey::Watching,
            WorkflowEvent::ChangesDetected { .. } => return None,
            WorkflowEvent::CycleFailed { error } if error.is_authentication() => {
                MessageKey::AuthenticationFailed
            }
            WorkflowEvent::CycleFailed { error } => return Some(error.to_string()),
        };
        Some(get_message(lang, key).to_string())
    }

    /// True for events that report a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            WorkflowEvent::UploadFailed
                | WorkflowEvent::UpdateFailed
                | WorkflowEvent::DeployFailed
                | WorkflowEvent::CycleFailed { .. }
        )
    }
}

/// Port trait for receiving workflow progress
pub trait IWorkflowObserver: Send + Sync {
    fn on_event(&self, event: &WorkflowEvent);
}

/// Observer that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IWorkflowObserver for NoopObserver {
    fn on_event(&self, _event: &WorkflowEvent) {}
}
