//! Integration tests for deployment and status polling

use kcustomize_api::{deploy, KintoneCustomizeClient, KintoneError};
use kcustomize_core::ports::ICustomizeClient;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_deploy_posts_app() {
    let (server, client) = common::setup_kintone_mock().await;

    Mock::given(method("POST"))
        .and(path("/k/v1/preview/app/deploy.json"))
        .and(body_json(serde_json::json!({ "apps": [{ "app": "42" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&server)
        .await;

    deploy::deploy(&client, "42").await.unwrap();
}

#[tokio::test]
async fn test_status_reports_processing_then_success() {
    let (server, client) = common::setup_kintone_mock().await;

    Mock::given(method("GET"))
        .and(path("/k/v1/preview/app/deploy.json"))
        .and(query_param("apps[0]", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "apps": [{ "app": "42", "status": "PROCESSING" }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/k/v1/preview/app/deploy.json"))
        .and(query_param("apps[0]", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "apps": [{ "app": "42", "status": "SUCCESS" }]
        })))
        .mount(&server)
        .await;

    assert!(!deploy::deploy_status(&client, "42").await.unwrap().done);
    assert!(deploy::deploy_status(&client, "42").await.unwrap().done);
}

#[tokio::test]
async fn test_failed_deployment_is_rejected() {
    let (server, client) = common::setup_kintone_mock().await;

    Mock::given(method("GET"))
        .and(path("/k/v1/preview/app/deploy.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "apps": [{ "app": "42", "status": "FAIL" }]
        })))
        .mount(&server)
        .await;

    let err = deploy::deploy_status(&client, "42").await.unwrap_err();
    assert!(matches!(err, KintoneError::DeployRejected { ref status, .. } if status == "FAIL"));
}

#[tokio::test]
async fn test_provider_deploy_authentication_failure() {
    let (server, client) = common::setup_kintone_mock().await;
    common::mount_authentication_error(&server, "POST", "/k/v1/preview/app/deploy.json").await;
    let provider = KintoneCustomizeClient::new(client);

    let err = provider.trigger_deployment("42").await.unwrap_err();
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_provider_polls_status() {
    let (server, client) = common::setup_kintone_mock().await;
    Mock::given(method("GET"))
        .and(path("/k/v1/preview/app/deploy.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "apps": [{ "app": "42", "status": "SUCCESS" }]
        })))
        .mount(&server)
        .await;
    let provider = KintoneCustomizeClient::new(client);

    assert!(provider.poll_deployment_status("42").await.unwrap().done);
}
