//! Integration tests for file upload and error classification

use std::io::Write;

use kcustomize_api::{upload, ClientOptions, KintoneCustomizeClient, KintoneError};
use kcustomize_core::domain::{ContentKind, CustomizeError, FileReference};
use kcustomize_core::ports::ICustomizeClient;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn temp_file(name: &str, content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    (dir, path)
}

#[tokio::test]
async fn test_upload_sends_multipart_with_auth_header() {
    let (server, client) = common::setup_kintone_mock().await;
    let (_dir, file) = temp_file("app.js", "console.log('hello');");

    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .and(header("X-Cybozu-Authorization", common::PASSWORD_AUTH))
        .and(body_string_contains("name=\"file\"; filename=\"app.js\""))
        .and(body_string_contains("text/javascript"))
        .and(body_string_contains("console.log('hello');"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "fileKey": "fk-js" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let key = upload::upload_file(&client, &file, ContentKind::Script)
        .await
        .expect("upload failed");
    assert_eq!(key.as_str(), "fk-js");
}

#[tokio::test]
async fn test_upload_css_uses_css_mime_type() {
    let (server, client) = common::setup_kintone_mock().await;
    let (_dir, file) = temp_file("app.css", "body { color: red; }");

    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .and(body_string_contains("text/css"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "fileKey": "fk-css" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let key = upload::upload_file(&client, &file, ContentKind::Style).await.unwrap();
    assert_eq!(key.as_str(), "fk-css");
}

#[tokio::test]
async fn test_guest_space_rewrites_path() {
    let (server, client) = common::setup_with(
        common::credentials(),
        ClientOptions {
            guest_space_id: Some(3),
            proxy: None,
        },
    )
    .await;
    let (_dir, file) = temp_file("app.js", "1");

    Mock::given(method("POST"))
        .and(path("/k/guest/3/v1/file.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "fileKey": "fk-guest" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let key = upload::upload_file(&client, &file, ContentKind::Script).await.unwrap();
    assert_eq!(key.as_str(), "fk-guest");
}

#[tokio::test]
async fn test_basic_auth_header_is_sent() {
    let credentials = common::credentials().with_basic_auth("basic", "secret");
    let (server, client) = common::setup_with(credentials, ClientOptions::default()).await;
    let (_dir, file) = temp_file("app.js", "1");

    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .and(header("Authorization", "Basic YmFzaWM6c2VjcmV0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "fileKey": "fk" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    upload::upload_file(&client, &file, ContentKind::Script).await.unwrap();
}

#[tokio::test]
async fn test_cb_wa01_is_authentication_error() {
    let (server, client) = common::setup_kintone_mock().await;
    common::mount_authentication_error(&server, "POST", "/k/v1/file.json").await;
    let (_dir, file) = temp_file("app.js", "1");

    let err = upload::upload_file(&client, &file, ContentKind::Script)
        .await
        .unwrap_err();
    match err {
        KintoneError::Authentication(message) => {
            assert_eq!(message, "Password authentication failed")
        }
        other => panic!("expected authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_other_520_codes_are_api_errors() {
    let (server, client) = common::setup_kintone_mock().await;
    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .respond_with(ResponseTemplate::new(520).set_body_json(serde_json::json!({
            "code": "GAIA_IL23",
            "message": "Temporarily unavailable"
        })))
        .mount(&server)
        .await;
    let (_dir, file) = temp_file("app.js", "1");

    let err = upload::upload_file(&client, &file, ContentKind::Script)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KintoneError::Api { status: 520, code: Some(ref code), .. } if code == "GAIA_IL23"
    ));
}

#[tokio::test]
async fn test_non_json_error_body_is_api_error() {
    let (server, client) = common::setup_kintone_mock().await;
    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;
    let (_dir, file) = temp_file("app.js", "1");

    let err = upload::upload_file(&client, &file, ContentKind::Script)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        KintoneError::Api { status: 502, code: None, ref message } if message == "Bad Gateway"
    ));
}

#[tokio::test]
async fn test_unparsable_success_body_is_invalid_response() {
    let (server, client) = common::setup_kintone_mock().await;
    Mock::given(method("POST"))
        .and(path("/k/v1/file.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;
    let (_dir, file) = temp_file("app.js", "1");

    let err = upload::upload_file(&client, &file, ContentKind::Script)
        .await
        .unwrap_err();
    assert!(matches!(err, KintoneError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_provider_maps_errors_into_domain() {
    let (server, client) = common::setup_kintone_mock().await;
    common::mount_authentication_error(&server, "POST", "/k/v1/file.json").await;
    let provider = KintoneCustomizeClient::new(client);
    let (_dir, file) = temp_file("app.js", "1");

    let err = provider
        .upload_file(&file, ContentKind::Script)
        .await
        .unwrap_err();
    assert!(err.is_authentication());

    let missing = provider
        .upload_file(std::path::Path::new("/nonexistent/app.js"), ContentKind::Script)
        .await
        .unwrap_err();
    assert!(matches!(missing, CustomizeError::Filesystem { .. }));
}

#[tokio::test]
async fn test_provider_resolves_urls_without_requests() {
    let (server, client) = common::setup_kintone_mock().await;
    let provider = KintoneCustomizeClient::new(client);

    let entry = provider
        .resolve_entry(
            &FileReference::parse("https://cdn.example.com/lib.js"),
            ContentKind::Script,
        )
        .await
        .unwrap();

    assert!(entry.file_key().is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_provider_uploads_local_entries() {
    let (server, client) = common::setup_kintone_mock().await;
    common::mount_upload(&server, "fk-local").await;
    let provider = KintoneCustomizeClient::new(client);
    let (_dir, file) = temp_file("app.js", "1");

    let entry = provider
        .resolve_entry(&FileReference::Local(file), ContentKind::Script)
        .await
        .unwrap();

    assert_eq!(entry.file_key().unwrap().as_str(), "fk-local");
}
