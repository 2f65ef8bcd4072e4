mod common;

use common::{configured, mock_get, mock_not_found};
use serde_json::json;
use terraform_provider_sendgrid::testing::TestError;
use terraform_provider_sendgrid::ProviderError;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "/v3/api_keys/key-1";

#[tokio::test]
async fn test_api_key_lifecycle() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/v3/api_keys"))
        .and(body_json(json!({"name": "ci", "scopes": ["mail.send"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "api_key_id": "key-1",
            "name": "ci",
            "scopes": ["mail.send", "2fa_required"],
            "api_key": "SG.secret"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_get(
        &server,
        KEY,
        json!({"api_key_id": "key-1", "name": "ci", "scopes": ["2fa_required", "mail.send"]}),
    )
    .await;

    let created = tester
        .apply_create("sendgrid_api_key", json!({"name": "ci", "scopes": ["mail.send"]}))
        .await
        .unwrap();
    assert_eq!(
        created,
        json!({"id": "key-1", "name": "ci", "scopes": ["mail.send"], "api_key": "SG.secret"})
    );

    // New scopes replace the old ones with a PUT.
    server.reset().await;
    Mock::given(method("PUT"))
        .and(path(KEY))
        .and(body_json(json!({"name": "ci-renamed", "scopes": ["alerts.read", "mail.send"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "api_key_id": "key-1",
            "name": "ci-renamed",
            "scopes": ["alerts.read", "mail.send"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_get(
        &server,
        KEY,
        json!({"result": [{"api_key_id": "key-1", "name": "ci-renamed", "scopes": ["alerts.read", "mail.send"]}]}),
    )
    .await;

    let updated = tester
        .apply_update(
            "sendgrid_api_key",
            created,
            json!({"name": "ci-renamed", "scopes": ["alerts.read", "mail.send"]}),
        )
        .await
        .unwrap();
    assert_eq!(updated["name"], "ci-renamed");
    assert_eq!(updated["api_key"], "SG.secret");

    // Imports cannot recover the secret.
    let imported = tester.import("sendgrid_api_key", "key-1").await.unwrap();
    assert_eq!(imported["name"], "ci-renamed");
    assert_eq!(imported["scopes"], json!(["alerts.read", "mail.send"]));
    assert!(imported["api_key"].is_null());

    Mock::given(method("DELETE"))
        .and(path(KEY))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    tester.apply_delete("sendgrid_api_key", updated).await.unwrap();
}

#[tokio::test]
async fn test_api_key_rename_without_scopes_patches() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("PATCH"))
        .and(path(KEY))
        .and(body_json(json!({"name": "renamed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "api_key_id": "key-1",
            "name": "renamed",
            "scopes": ["mail.send"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = tester
        .update(
            "sendgrid_api_key",
            json!({"id": "key-1", "name": "ci", "scopes": null, "api_key": "SG.secret"}),
            json!({"id": "key-1", "name": "renamed", "scopes": null, "api_key": "SG.secret"}),
        )
        .await
        .unwrap();
    assert_eq!(state["name"], "renamed");
    assert_eq!(state["api_key"], "SG.secret");
}

#[tokio::test]
async fn test_api_key_deleted_outside_is_gone() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    mock_not_found(&server, "GET", KEY).await;
    mock_not_found(&server, "DELETE", KEY).await;

    let state = json!({"id": "key-1", "name": "ci", "scopes": ["mail.send"], "api_key": "SG.secret"});
    assert!(tester
        .refresh("sendgrid_api_key", state.clone())
        .await
        .unwrap()
        .is_none());

    // Deleting what is already gone succeeds.
    tester.delete("sendgrid_api_key", state).await.unwrap();

    let err = tester.import("sendgrid_api_key", "key-1").await.unwrap_err();
    assert!(matches!(err, TestError::Provider(ProviderError::NotFound(_))));
}

#[tokio::test]
async fn test_api_key_forbidden_is_permission_denied() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    Mock::given(method("POST"))
        .and(path("/v3/api_keys"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"errors": [{"field": null, "message": "access forbidden"}]})),
        )
        .mount(&server)
        .await;

    let err = tester
        .apply_create("sendgrid_api_key", json!({"name": "ci"}))
        .await
        .unwrap_err();
    match err {
        TestError::Provider(ProviderError::PermissionDenied(message)) => {
            assert!(message.contains("access forbidden"));
        }
        other => panic!("unexpected error: {}", other),
    }
}
