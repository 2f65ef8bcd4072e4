mod common;

use common::{configured, mock_get};
use serde_json::json;
use terraform_provider_sendgrid::testing::assert_plan_replaces;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMAIL: &str = "dev@example.com";

fn pending_state(scopes: &[&str]) -> serde_json::Value {
    json!({
        "id": EMAIL,
        "email": EMAIL,
        "is_admin": false,
        "scopes": scopes,
        "username": null,
        "first_name": null,
        "last_name": null,
        "user_type": null,
        "pending": true
    })
}

async fn mock_pending(server: &MockServer, scopes: &[&str]) {
    mock_get(server, "/v3/teammates", json!({"result": []})).await;
    mock_get(
        server,
        "/v3/teammates/pending",
        json!({"result": [{"email": EMAIL, "token": "tok-1", "scopes": scopes, "is_admin": false}]}),
    )
    .await;
}

#[tokio::test]
async fn test_invite_is_pending_until_accepted() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/v3/teammates"))
        .and(body_json(json!({"email": EMAIL, "scopes": ["mail.send"], "is_admin": false})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "email": EMAIL,
            "token": "tok-1",
            "scopes": ["mail.send"],
            "is_admin": false
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_pending(&server, &["mail.send"]).await;

    let state = tester
        .apply_create("sendgrid_teammate", json!({"email": EMAIL, "scopes": ["mail.send"]}))
        .await
        .unwrap();
    assert_eq!(state, pending_state(&["mail.send"]));

    // Once accepted the teammate is found by username.
    server.reset().await;
    mock_get(
        &server,
        "/v3/teammates",
        json!({"result": [{"username": "dev", "email": EMAIL, "user_type": "teammate", "is_admin": false}]}),
    )
    .await;
    mock_get(
        &server,
        "/v3/teammates/dev",
        json!({
            "username": "dev",
            "email": EMAIL,
            "first_name": "Dee",
            "last_name": "Vee",
            "user_type": "teammate",
            "is_admin": false,
            "scopes": ["mail.send", "2fa_exempt"]
        }),
    )
    .await;

    let accepted = tester
        .refresh("sendgrid_teammate", state)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(accepted["pending"], false);
    assert_eq!(accepted["username"], "dev");
    assert_eq!(accepted["first_name"], "Dee");
    assert_eq!(accepted["scopes"], json!(["mail.send"]));

    Mock::given(method("DELETE"))
        .and(path("/v3/teammates/dev"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    tester.apply_delete("sendgrid_teammate", accepted).await.unwrap();
}

#[tokio::test]
async fn test_pending_invite_update_reinvites() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    mock_get(&server, "/v3/teammates", json!({"result": []})).await;
    mock_get(
        &server,
        "/v3/teammates/pending",
        json!({"result": [{"email": EMAIL, "token": "tok-1", "scopes": ["mail.send"], "is_admin": false}]}),
    )
    .await;

    Mock::given(method("DELETE"))
        .and(path("/v3/teammates/pending/tok-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v3/teammates"))
        .and(body_json(json!({"email": EMAIL, "scopes": ["alerts.read", "mail.send"], "is_admin": false})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "email": EMAIL,
            "token": "tok-2",
            "scopes": ["alerts.read", "mail.send"],
            "is_admin": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let state = tester
        .update(
            "sendgrid_teammate",
            pending_state(&["mail.send"]),
            pending_state(&["alerts.read", "mail.send"]),
        )
        .await
        .unwrap();
    assert_eq!(state["scopes"], json!(["alerts.read", "mail.send"]));
    assert_eq!(state["pending"], true);
}

#[tokio::test]
async fn test_admin_invite_sends_no_scopes() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    let config = json!({"email": EMAIL, "is_admin": true, "scopes": ["mail.send"]});

    let warnings = tester
        .validate_resource_config("sendgrid_teammate", config.clone())
        .await
        .unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].attribute.as_deref(), Some("scopes"));

    Mock::given(method("POST"))
        .and(path("/v3/teammates"))
        .and(body_json(json!({"email": EMAIL, "scopes": [], "is_admin": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "email": EMAIL,
            "token": "tok-1",
            "is_admin": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let plan = tester.plan_create("sendgrid_teammate", config).await.unwrap();
    let state = tester
        .create("sendgrid_teammate", plan.planned_state)
        .await
        .unwrap();
    assert_eq!(state["is_admin"], true);
    assert_eq!(state["scopes"], json!(["mail.send"]));
}

#[tokio::test]
async fn test_pending_delete_revokes_invite() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    mock_pending(&server, &["mail.send"]).await;
    Mock::given(method("DELETE"))
        .and(path("/v3/teammates/pending/tok-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    tester
        .apply_delete("sendgrid_teammate", pending_state(&["mail.send"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unknown_teammate_is_gone() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    mock_get(&server, "/v3/teammates", json!({"result": []})).await;
    mock_get(&server, "/v3/teammates/pending", json!({"result": []})).await;

    assert!(tester
        .refresh("sendgrid_teammate", pending_state(&[]))
        .await
        .unwrap()
        .is_none());

    // Changing the email invites someone else.
    let plan = tester
        .plan_update(
            "sendgrid_teammate",
            pending_state(&["mail.send"]),
            json!({"email": "other@example.com", "scopes": ["mail.send"]}),
        )
        .await
        .unwrap();
    assert_plan_replaces(&plan);
}
