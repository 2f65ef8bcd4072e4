mod common;

use common::{configured, mock_not_found};
use serde_json::json;
use terraform_provider_sendgrid::testing::{assert_plan_replaces, assert_plan_updates_in_place};
use tokio_test::assert_ok;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALERT: &str = "/v3/alerts/42";

fn usage_alert(email_to: &str, percentage: i64) -> serde_json::Value {
    json!({"id": 42, "type": "usage_limit", "email_to": email_to, "percentage": percentage})
}

#[tokio::test]
async fn test_alert_lifecycle() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    Mock::given(method("POST"))
        .and(path("/v3/alerts"))
        .and(body_json(json!({"type": "usage_limit", "email_to": "ops@example.com", "percentage": 90})))
        .respond_with(ResponseTemplate::new(201).set_body_json(usage_alert("ops@example.com", 90)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ALERT))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_alert("ops@example.com", 90)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Updates never resend the type.
    Mock::given(method("PATCH"))
        .and(path(ALERT))
        .and(body_json(json!({"email_to": "alerts@example.com", "percentage": 75})))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_alert("alerts@example.com", 75)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ALERT))
        .respond_with(ResponseTemplate::new(200).set_body_json(usage_alert("alerts@example.com", 75)))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(ALERT))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let states = assert_ok!(
        tester
            .lifecycle_crud(
                "sendgrid_alert",
                json!({"type": "usage_limit", "email_to": "ops@example.com", "percentage": 90}),
                json!({"type": "usage_limit", "email_to": "alerts@example.com", "percentage": 75}),
            )
            .await
    );

    assert_eq!(
        states.created,
        json!({"id": "42", "type": "usage_limit", "email_to": "ops@example.com", "frequency": null, "percentage": 90})
    );
    assert_eq!(states.updated["email_to"], "alerts@example.com");
    assert_eq!(states.imported, states.updated);
}

#[tokio::test]
async fn test_alert_plans() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    let prior = json!({
        "id": "42",
        "type": "usage_limit",
        "email_to": "ops@example.com",
        "frequency": null,
        "percentage": 90
    });

    let plan = assert_ok!(
        tester
            .plan_update(
                "sendgrid_alert",
                prior.clone(),
                json!({"type": "usage_limit", "email_to": "ops@example.com", "percentage": 80}),
            )
            .await
    );
    assert_plan_updates_in_place(&plan);

    let plan = assert_ok!(
        tester
            .plan_update(
                "sendgrid_alert",
                prior,
                json!({"type": "stats_notification", "email_to": "ops@example.com", "frequency": "daily"}),
            )
            .await
    );
    assert_plan_replaces(&plan);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_alert_requires_frequency_for_stats() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;

    let err = tester
        .apply_create(
            "sendgrid_alert",
            json!({"type": "stats_notification", "email_to": "ops@example.com"}),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("frequency"), "{}", err);
}

#[tokio::test]
async fn test_alert_deleted_outside_is_gone() {
    let server = MockServer::start().await;
    let tester = configured(&server).await;
    mock_not_found(&server, "GET", ALERT).await;

    let state = json!({"id": "42", "type": "usage_limit", "email_to": "ops@example.com", "frequency": null, "percentage": 90});
    assert!(assert_ok!(tester.refresh("sendgrid_alert", state).await).is_none());
}
