//! Deployment endpoints
//!
//! - [`deploy`] - `POST /k/v1/preview/app/deploy.json`
//! - [`deploy_status`] - `GET /k/v1/preview/app/deploy.json`
//!
//! kintone reports one of `PROCESSING`, `SUCCESS`, `FAIL` or `CANCEL` per app.

use kcustomize_core::domain::DeployStatus;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::client::KintoneClient;
use crate::KintoneError;

const DEPLOY_PATH: &str = "/k/v1/preview/app/deploy.json";

const STATUS_SUCCESS: &str = "SUCCESS";
const STATUS_PROCESSING: &str = "PROCESSING";

#[derive(Debug, Deserialize, Serialize)]
struct AppStatus {
    #[serde(default)]
    app: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    apps: Vec<AppStatus>,
}

/// Deploys the preview settings of `app`
pub async fn deploy(client: &KintoneClient, app: &str) -> Result<(), KintoneError> {
    let body = json!({ "apps": [{ "app": app }] });
    let _: serde_json::Value = client
        .send_json(client.request(Method::POST, DEPLOY_PATH).json(&body))
        .await?;
    info!(app, "Deployment requested");
    Ok(())
}

/// Checks the deployment status of `app` once
///
/// # Errors
/// Returns [`KintoneError::DeployRejected`] when an app reports a status
/// other than processing or success, since it will never finish.
pub async fn deploy_status(client: &KintoneClient, app: &str) -> Result<DeployStatus, KintoneError> {
    let response: StatusResponse = client
        .send_json(
            client
                .request(Method::GET, DEPLOY_PATH)
                .query(&[("apps[0]", app)]),
        )
        .await?;
    summarize(app, &response.apps)
}

fn summarize(app: &str, apps: &[AppStatus]) -> Result<DeployStatus, KintoneError> {
    if let Some(rejected) = apps
        .iter()
        .find(|a| a.status != STATUS_SUCCESS && a.status != STATUS_PROCESSING)
    {
        warn!(app, status = %rejected.status, "Deployment did not succeed");
        return Err(KintoneError::DeployRejected {
            app: rejected.app.clone().unwrap_or_else(|| app.to_string()),
            status: rejected.status.clone(),
        });
    }

    let done = apps.iter().all(|a| a.status == STATUS_SUCCESS);
    debug!(app, done, "Deployment status");
    Ok(DeployStatus { done })
}
