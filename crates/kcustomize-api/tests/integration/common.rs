//! Shared test helpers for kintone API integration tests
//!
//! Each helper mounts the necessary mock endpoints on a wiremock server.
//! Clients are pointed at the mock server with `KintoneClient::with_base_url`.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kcustomize_api::{ClientOptions, Credentials, KintoneClient};

/// `base64("user:pass")`
pub const PASSWORD_AUTH: &str = "dXNlcjpwYXNz";

pub fn credentials() -> Credentials {
    Credentials::new("user", "pass")
}

/// Starts a mock server and returns a client pointed at it
pub async fn setup_kintone_mock() -> (MockServer, KintoneClient) {
    setup_with(credentials(), ClientOptions::default()).await
}

pub async fn setup_with(
    credentials: Credentials,
    options: ClientOptions,
) -> (MockServer, KintoneClient) {
    let server = MockServer::start().await;
    let client = KintoneClient::with_base_url(server.uri(), credentials, options)
        .expect("failed to build client");
    (server, client)
}

/// Mounts an endpoint answering with kintone's authentication error
pub async fn mount_authentication_error(server: &MockServer, http_method: &str, api_path: &str) {
    Mock::given(method(http_method))
        .and(path(api_path))
        .respond_with(ResponseTemplate::new(520).set_body_json(serde_json::json!({
            "code": "CB_WA01",
            "id": "1505999166-897850006",
            "message": "Password authentication failed"
        })))
        .mount(server)
        .await;
}

/// Mounts a file upload endpoint returning `file_key`
pub async fn mount_upload(server: &MockServer, file_key: &str) {
    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "fileKey": file_key })),
        )
        .mount(server)
        .await;
}
