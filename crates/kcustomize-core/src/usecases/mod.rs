//! Use cases (interactors) for kcustomize
//!
//! This module contains the application use cases that orchestrate
//! domain types and port interfaces.
//!
//! ## Use Cases
//!
//! - [`UploadDeployUseCase`] - Upload changed files, replace the customize
//!   setting, deploy, and wait for the deployment to finish

pub mod upload_deploy;

pub use upload_deploy::{RunStatus, UploadDeployUseCase, MAX_RETRY_COUNT};
