mod common;

use common::{configured, mock_get};
use serde_json::json;
use terraform_provider_sendgrid::testing::{assert_plan_no_changes, TestError};
use terraform_provider_sendgrid::ProviderService;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNCE_PURGE: &str = "/v3/mail_settings/bounce_purge";

#[tokio::test]
async fn test_bounce_settings_read_back() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let stored = json!({"enabled": true, "soft_bounces": 30, "hard_bounces": 45});
    Mock::given(method("PATCH"))
        .and(path(BOUNCE_PURGE))
        .and(body_json(stored.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored.clone()))
        .expect(1)
        .mount(&server)
        .await;
    mock_get(&server, BOUNCE_PURGE, stored).await;

    let config = json!({"soft_bounces": 30, "hard_bounces": 45});
    let state = tester
        .apply_create("sendgrid_bounce_settings", config.clone())
        .await
        .unwrap();

    assert_eq!(
        state,
        json!({"id": "bounce_purge", "enabled": true, "soft_bounces": 30, "hard_bounces": 45})
    );

    // Reapplying the same configuration is a no-op.
    let plan = tester
        .plan_update("sendgrid_bounce_settings", state, config)
        .await
        .unwrap();
    assert_plan_no_changes(&plan);
}

#[tokio::test]
async fn test_bounce_settings_rejects_out_of_range_days() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let err = tester
        .apply_create("sendgrid_bounce_settings", json!({"soft_bounces": 0}))
        .await
        .unwrap_err();
    match err {
        TestError::Diagnostics(diagnostics) => {
            assert_eq!(diagnostics[0].attribute.as_deref(), Some("soft_bounces"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bounce_settings_delete_disables_purge() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("PATCH"))
        .and(path(BOUNCE_PURGE))
        .and(body_json(json!({"enabled": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"enabled": false})))
        .expect(1)
        .mount(&server)
        .await;

    tester
        .apply_delete(
            "sendgrid_bounce_settings",
            json!({"id": "bounce_purge", "enabled": true, "soft_bounces": 30, "hard_bounces": 45}),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_enforced_tls_lifecycle() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    let route = "/v3/user/settings/enforced_tls";

    let enforced = json!({"require_tls": true, "require_valid_cert": false, "version": 1.2});
    Mock::given(method("PATCH"))
        .and(path(route))
        .and(body_json(enforced.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(enforced.clone()))
        .expect(1)
        .mount(&server)
        .await;
    mock_get(&server, route, enforced).await;

    let state = tester
        .apply_create(
            "sendgrid_enforced_tls_settings",
            json!({"require_tls": true, "version": 1.2}),
        )
        .await
        .unwrap();
    assert_eq!(state["id"], "enforced_tls");
    assert_eq!(state["require_tls"], true);
    assert_eq!(state["require_valid_cert"], false);
    assert_eq!(state["version"], 1.2);

    // Any id imports the singleton.
    let imported = tester
        .import("sendgrid_enforced_tls_settings", "whatever")
        .await
        .unwrap();
    assert_eq!(imported, state);
}

#[tokio::test]
async fn test_enforced_tls_rejects_unknown_version() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let diagnostics = tester
        .provider()
        .validate_resource_config("sendgrid_enforced_tls_settings", json!({"version": 1.0}))
        .await
        .unwrap();
    assert!(diagnostics.iter().any(|d| d.attribute.as_deref() == Some("version")));
}

#[tokio::test]
async fn test_click_tracking_update_and_reset() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    let route = "/v3/tracking_settings/click";

    Mock::given(method("PATCH"))
        .and(path(route))
        .and(body_json(json!({"enabled": true, "enable_text": false})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"enabled": true, "enable_text": false})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mock_get(&server, route, json!({"enabled": true, "enable_text": false})).await;

    let created = tester
        .apply_create("sendgrid_click_tracking_settings", json!({"enabled": true}))
        .await
        .unwrap();
    assert_eq!(
        created,
        json!({"id": "click_tracking", "enabled": true, "enable_text": false})
    );

    server.reset().await;
    Mock::given(method("PATCH"))
        .and(path(route))
        .and(body_json(json!({"enabled": true, "enable_text": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"enabled": true, "enable_text": true})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mock_get(&server, route, json!({"enabled": true, "enable_text": true})).await;

    let updated = tester
        .apply_update(
            "sendgrid_click_tracking_settings",
            created,
            json!({"enabled": true, "enable_text": true}),
        )
        .await
        .unwrap();
    assert_eq!(updated["enable_text"], true);

    server.reset().await;
    Mock::given(method("PATCH"))
        .and(path(route))
        .and(body_json(json!({"enabled": false, "enable_text": false})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"enabled": false, "enable_text": false})),
        )
        .expect(1)
        .mount(&server)
        .await;

    tester
        .apply_delete("sendgrid_click_tracking_settings", updated)
        .await
        .unwrap();
}
