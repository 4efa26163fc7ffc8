//! File upload for the kintone REST API
//!
//! - [`upload_file`] - Sends one file as `multipart/form-data` to
//!   `POST /k/v1/file.json` and returns the resulting file key
//!
//! A file key is only valid until it is referenced by a setting, so every
//! changed file is uploaded again.

use std::path::Path;

use kcustomize_core::domain::{ContentKind, FileKey};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::KintoneClient;
use crate::KintoneError;

const FILE_PATH: &str = "/k/v1/file.json";

/// Multipart field kintone reads the file from
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_key: String,
}

/// Uploads a local file and returns its file key
///
/// # Arguments
/// * `client` - Authenticated kintone client
/// * `path` - Local file to upload
/// * `kind` - Content kind, sent as the part's MIME type
///
/// # Errors
/// Returns [`KintoneError::Io`] if the file cannot be read, otherwise any
/// error from [`KintoneClient::send_json`].
pub async fn upload_file(
    client: &KintoneClient,
    path: &Path,
    kind: ContentKind,
) -> Result<FileKey, KintoneError> {
    let content = tokio::fs::read(path).await.map_err(|source| KintoneError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| FILE_FIELD.to_string());

    debug!(path = %path.display(), bytes = content.len(), mime = kind.mime_type(), "Uploading file");

    let part = Part::bytes(content)
        .file_name(file_name)
        .mime_str(kind.mime_type())?;
    let form = Form::new().part(FILE_FIELD, part);

    let response: UploadResponse = client
        .send_json(client.request(Method::POST, FILE_PATH).multipart(form))
        .await?;

    info!(path = %path.display(), file_key = %response.file_key, "File uploaded");
    Ok(FileKey::new(response.file_key))
}
