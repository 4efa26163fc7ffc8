//! KintoneCustomizeClient - ICustomizeClient implementation for kintone
//!
//! Wraps the [`KintoneClient`] and delegates to the upload, customize and
//! deploy modules to fulfil the [`ICustomizeClient`] port contract.
//! Adapter errors are converted into [`CustomizeError`] at this boundary.

use std::path::Path;

use kcustomize_core::domain::{
    ContentKind, CustomizeError, CustomizeSetting, DeployStatus, FileKey, RemoteCustomize,
};
use kcustomize_core::ports::ICustomizeClient;

use crate::client::KintoneClient;
use crate::{customize, deploy, upload};

/// kintone implementation of [`ICustomizeClient`]
pub struct KintoneCustomizeClient {
    client: KintoneClient,
}

impl KintoneCustomizeClient {
    pub fn new(client: KintoneClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ICustomizeClient for KintoneCustomizeClient {
    async fn upload_file(&self, path: &Path, kind: ContentKind) -> Result<FileKey, CustomizeError> {
        Ok(upload::upload_file(&self.client, path, kind).await?)
    }

    async fn replace_configuration(
        &self,
        setting: &CustomizeSetting,
    ) -> Result<(), CustomizeError> {
        Ok(customize::update_customize(&self.client, setting).await?)
    }

    async fn trigger_deployment(&self, app: &str) -> Result<(), CustomizeError> {
        Ok(deploy::deploy(&self.client, app).await?)
    }

    async fn poll_deployment_status(&self, app: &str) -> Result<DeployStatus, CustomizeError> {
        Ok(deploy::deploy_status(&self.client, app).await?)
    }

    async fn fetch_configuration(&self, app: &str) -> Result<RemoteCustomize, CustomizeError> {
        Ok(customize::get_customize(&self.client, app).await?)
    }
}
