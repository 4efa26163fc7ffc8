//! Customize setting endpoints
//!
//! - [`update_customize`] - `PUT /k/v1/preview/app/customize.json`
//! - [`get_customize`] - `GET /k/v1/app/customize.json`

use kcustomize_core::domain::{CustomizeSetting, RemoteCustomize};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::KintoneClient;
use crate::KintoneError;

const PREVIEW_CUSTOMIZE_PATH: &str = "/k/v1/preview/app/customize.json";
const CUSTOMIZE_PATH: &str = "/k/v1/app/customize.json";

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default)]
    revision: Option<String>,
}

/// Replaces the preview customize setting of `setting.app`
pub async fn update_customize(
    client: &KintoneClient,
    setting: &CustomizeSetting,
) -> Result<(), KintoneError> {
    debug!(app = %setting.app, "Replacing preview customize setting");
    let response: UpdateResponse = client
        .send_json(client.request(Method::PUT, PREVIEW_CUSTOMIZE_PATH).json(setting))
        .await?;
    info!(app = %setting.app, revision = ?response.revision, "Preview customize setting replaced");
    Ok(())
}

/// Fetches the live customize setting of `app`
pub async fn get_customize(client: &KintoneClient, app: &str) -> Result<RemoteCustomize, KintoneError> {
    debug!(app, "Fetching customize setting");
    client
        .send_json(
            client
                .request(Method::GET, CUSTOMIZE_PATH)
                .query(&[("app", app)]),
        )
        .await
}
