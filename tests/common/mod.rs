//! Shared setup for the mocked acceptance tests.

#![allow(dead_code)]

use serde_json::json;
use terraform_provider_sendgrid::testing::ProviderTester;
use terraform_provider_sendgrid::SendGridProvider;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_KEY: &str = "SG.test-key";

/// A provider configured against the mock server.
pub async fn configured(server: &MockServer) -> ProviderTester<SendGridProvider> {
    let tester = ProviderTester::new(SendGridProvider::new());
    tester
        .configure(json!({"api_key": API_KEY, "host": server.uri()}))
        .await
        .expect("configure against mock server");
    tester
}

/// Mount a GET that answers with `body`, requiring the bearer key.
pub async fn mock_get(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {}", API_KEY).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a route that answers 404 with SendGrid's error envelope.
pub async fn mock_not_found(server: &MockServer, verb: &str, route: &str) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"errors": [{"field": null, "message": "resource not found"}]})),
        )
        .mount(server)
        .await;
}
