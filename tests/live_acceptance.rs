//! Acceptance tests against a real SendGrid account.
//!
//! Ignored by default. Run with
//! `SENDGRID_API_KEY=... cargo test --test live_acceptance -- --ignored`.
//! Teammate and domain tests also need `SENDGRID_TEST_TEAMMATE_EMAIL` and
//! `SENDGRID_TEST_DOMAIN`; they skip themselves when those are unset.

use serde_json::json;
use terraform_provider_sendgrid::testing::ProviderTester;
use terraform_provider_sendgrid::SendGridProvider;

async fn live_tester() -> Option<ProviderTester<SendGridProvider>> {
    if std::env::var("SENDGRID_API_KEY").is_err() {
        eprintln!("SENDGRID_API_KEY not set, skipping");
        return None;
    }
    let tester = ProviderTester::new(SendGridProvider::new());
    // Credentials come from the environment.
    tester.configure(json!({})).await.expect("configure provider");
    Some(tester)
}

fn unique(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", prefix, nanos)
}

#[tokio::test]
#[ignore]
async fn live_api_key_lifecycle() {
    let Some(tester) = live_tester().await else {
        return;
    };
    let name = unique("acc-key");

    let states = tester
        .lifecycle_crud(
            "sendgrid_api_key",
            json!({"name": name, "scopes": ["alerts.read"]}),
            json!({"name": format!("{}-renamed", name), "scopes": ["alerts.read", "mail.send"]}),
        )
        .await
        .unwrap();

    assert!(states.created["api_key"].as_str().is_some_and(|s| s.starts_with("SG.")));
    assert_eq!(states.updated["scopes"], json!(["alerts.read", "mail.send"]));
    assert!(states.imported["api_key"].is_null());
}

#[tokio::test]
#[ignore]
async fn live_alert_lifecycle() {
    let Some(tester) = live_tester().await else {
        return;
    };

    let states = tester
        .lifecycle_crud(
            "sendgrid_alert",
            json!({"type": "usage_limit", "email_to": "alerts@example.com", "percentage": 90}),
            json!({"type": "usage_limit", "email_to": "alerts@example.com", "percentage": 80}),
        )
        .await
        .unwrap();
    assert_eq!(states.updated["percentage"], 80);
}

#[tokio::test]
#[ignore]
async fn live_settings_read() {
    let Some(tester) = live_tester().await else {
        return;
    };

    for data_source in [
        "sendgrid_bounce_settings",
        "sendgrid_enforced_tls_settings",
        "sendgrid_click_tracking_settings",
    ] {
        let state = tester.read_data_source(data_source, json!({})).await.unwrap();
        assert!(state["id"].is_string(), "{}", data_source);
    }
}

#[tokio::test]
#[ignore]
async fn live_teammate_invite() {
    let Some(tester) = live_tester().await else {
        return;
    };
    let Ok(email) = std::env::var("SENDGRID_TEST_TEAMMATE_EMAIL") else {
        eprintln!("SENDGRID_TEST_TEAMMATE_EMAIL not set, skipping");
        return;
    };

    let state = tester
        .apply_create("sendgrid_teammate", json!({"email": email, "scopes": ["mail.send"]}))
        .await
        .unwrap();
    assert_eq!(state["pending"], true);
    tester.apply_delete("sendgrid_teammate", state).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn live_sender_authentication() {
    let Some(tester) = live_tester().await else {
        return;
    };
    let Ok(domain) = std::env::var("SENDGRID_TEST_DOMAIN") else {
        eprintln!("SENDGRID_TEST_DOMAIN not set, skipping");
        return;
    };

    let state = tester
        .apply_create("sendgrid_sender_authentication", json!({"domain": domain}))
        .await
        .unwrap();
    assert!(!state["dns"].as_array().unwrap().is_empty());
    tester
        .apply_delete("sendgrid_sender_authentication", state)
        .await
        .unwrap();
}
