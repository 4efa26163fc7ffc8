//! Integration tests for the customize setting endpoints

use kcustomize_api::customize;
use kcustomize_core::domain::{
    CustomizeEntry, CustomizeManifest, CustomizeScope, CustomizeSetting, FileKey,
};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn setting() -> CustomizeSetting {
    let manifest = CustomizeManifest::from_json(
        r#"{"app": "42", "scope": "ADMIN", "desktop": {"js": [], "css": []}}"#,
    )
    .unwrap();
    CustomizeSetting::from_resolved(
        &manifest,
        vec![
            CustomizeEntry::url("https://cdn.example.com/lib.js"),
            CustomizeEntry::file(FileKey::new("fk-1")),
        ],
        vec![CustomizeEntry::file(FileKey::new("fk-2"))],
        vec![],
    )
}

#[tokio::test]
async fn test_update_customize_sends_setting() {
    let (server, client) = common::setup_kintone_mock().await;

    Mock::given(method("PUT"))
        .and(path("/k/v1/preview/app/customize.json"))
        .and(body_json(serde_json::json!({
            "app": "42",
            "scope": "ADMIN",
            "desktop": {
                "js": [
                    { "type": "URL", "url": "https://cdn.example.com/lib.js" },
                    { "type": "FILE", "file": { "fileKey": "fk-1" } }
                ],
                "css": [
                    { "type": "FILE", "file": { "fileKey": "fk-2" } }
                ]
            },
            "mobile": { "js": [] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "revision": "7" })))
        .expect(1)
        .mount(&server)
        .await;

    customize::update_customize(&client, &setting()).await.unwrap();
}

#[tokio::test]
async fn test_get_customize_parses_remote_setting() {
    let (server, client) = common::setup_kintone_mock().await;

    Mock::given(method("GET"))
        .and(path("/k/v1/app/customize.json"))
        .and(query_param("app", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "scope": "ALL",
            "desktop": {
                "js": [
                    {
                        "type": "FILE",
                        "file": {
                            "contentType": "text/javascript",
                            "fileKey": "remote-1",
                            "name": "app.js",
                            "size": "12"
                        }
                    },
                    { "type": "URL", "url": "https://cdn.example.com/lib.js" }
                ],
                "css": []
            },
            "mobile": { "js": [] },
            "revision": "3"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = customize::get_customize(&client, "42").await.unwrap();
    assert_eq!(remote.scope, CustomizeScope::All);
    assert_eq!(remote.desktop.js.len(), 2);
    assert_eq!(remote.desktop.js[0].file_key().unwrap().as_str(), "remote-1");
    assert_eq!(remote.revision.as_deref(), Some("3"));
}
