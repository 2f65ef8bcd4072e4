use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{decode, encode, found, gone_ok, numeric_id, require_id, Resource};
use crate::client::{Alert, AlertRequest, SendGridClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};

const TYPE_NAME: &str = "sendgrid_alert";

pub(crate) const STATS_NOTIFICATION: &str = "stats_notification";
pub(crate) const USAGE_LIMIT: &str = "usage_limit";

/// `sendgrid_alert` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AlertState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub alert_type: String,
    #[serde(default)]
    pub email_to: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub percentage: Option<i64>,
}

impl From<Alert> for AlertState {
    fn from(alert: Alert) -> Self {
        Self {
            id: Some(alert.id.to_string()),
            alert_type: alert.alert_type,
            email_to: alert.email_to,
            frequency: alert.frequency,
            percentage: alert.percentage,
        }
    }
}

impl AlertState {
    fn request(&self) -> AlertRequest {
        AlertRequest {
            alert_type: Some(self.alert_type.clone()),
            email_to: self.email_to.clone(),
            frequency: self.frequency.clone(),
            percentage: self.percentage,
        }
    }
}

/// Usage and statistics email alerts.
pub struct AlertResource;

#[async_trait]
impl Resource for AlertResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An email alert on account usage or statistics")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "type",
                Attribute::required_string()
                    .with_force_new()
                    .with_allowed_values([STATS_NOTIFICATION, USAGE_LIMIT])
                    .with_description("Alert type"),
            )
            .with_attribute(
                "email_to",
                Attribute::required_string().with_description("Recipient address"),
            )
            .with_attribute(
                "frequency",
                Attribute::optional_string()
                    .with_allowed_values(["daily", "weekly", "monthly"])
                    .with_description("How often statistics are sent. stats_notification only"),
            )
            .with_attribute(
                "percentage",
                Attribute::optional_int64()
                    .with_description("Usage threshold that triggers the alert. usage_limit only"),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let alert_type = config.get("type").and_then(Value::as_str);
        let frequency = config.get("frequency").filter(|v| !v.is_null());
        let percentage = config.get("percentage").filter(|v| !v.is_null());

        let mut diagnostics = Vec::new();
        match alert_type {
            Some(STATS_NOTIFICATION) => {
                if frequency.is_none() {
                    diagnostics.push(
                        Diagnostic::error("Missing frequency")
                            .with_detail("stats_notification alerts require frequency")
                            .with_attribute("frequency"),
                    );
                }
                if percentage.is_some() {
                    diagnostics.push(
                        Diagnostic::error("Unexpected percentage")
                            .with_detail("percentage only applies to usage_limit alerts")
                            .with_attribute("percentage"),
                    );
                }
            }
            Some(USAGE_LIMIT) => {
                match percentage.and_then(Value::as_f64) {
                    None => diagnostics.push(
                        Diagnostic::error("Missing percentage")
                            .with_detail("usage_limit alerts require percentage")
                            .with_attribute("percentage"),
                    ),
                    Some(p) if !(0.0..=100.0).contains(&p) => diagnostics.push(
                        Diagnostic::error("Invalid percentage")
                            .with_detail(format!("percentage must be between 0 and 100, got {}", p))
                            .with_attribute("percentage"),
                    ),
                    Some(_) => {}
                }
                if frequency.is_some() {
                    diagnostics.push(
                        Diagnostic::error("Unexpected frequency")
                            .with_detail("frequency only applies to stats_notification alerts")
                            .with_attribute("frequency"),
                    );
                }
            }
            _ => {}
        }
        diagnostics
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: AlertState = decode(planned)?;
        let alert = client.create_alert(&planned.request()).await?;
        info!(id = alert.id, "created alert");
        encode(&AlertState::from(alert))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, state: Value) -> Result<Option<Value>, ProviderError> {
        let state: AlertState = decode(state)?;
        let id = numeric_id(&require_id(state.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        match found(client.get_alert(id).await)? {
            Some(alert) => Ok(Some(encode(&AlertState::from(alert))?)),
            None => Ok(None),
        }
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn update(
        &self,
        client: &SendGridClient,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        let prior: AlertState = decode(prior)?;
        let planned: AlertState = decode(planned)?;
        let id = numeric_id(&require_id(prior.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        let alert = client.update_alert(id, &planned.request()).await?;
        encode(&AlertState::from(alert))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, client: &SendGridClient, state: Value) -> Result<(), ProviderError> {
        let state: AlertState = decode(state)?;
        let id = numeric_id(&require_id(state.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        gone_ok(client.delete_alert(id).await)?;
        info!(id, "deleted alert");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect()
    }

    #[test]
    fn test_stats_notification_rules() {
        let resource = AlertResource;
        assert!(resource
            .validate(&json!({"type": "stats_notification", "email_to": "a@b.c", "frequency": "daily"}))
            .is_empty());

        let diagnostics =
            resource.validate(&json!({"type": "stats_notification", "email_to": "a@b.c", "percentage": 50}));
        assert_eq!(attributes(&diagnostics), vec!["frequency", "percentage"]);
    }

    #[test]
    fn test_usage_limit_rules() {
        let resource = AlertResource;
        assert!(resource
            .validate(&json!({"type": "usage_limit", "email_to": "a@b.c", "percentage": 0}))
            .is_empty());
        assert!(resource
            .validate(&json!({"type": "usage_limit", "email_to": "a@b.c", "percentage": 100}))
            .is_empty());

        let diagnostics = resource.validate(&json!({"type": "usage_limit", "email_to": "a@b.c"}));
        assert_eq!(attributes(&diagnostics), vec!["percentage"]);

        let diagnostics = resource.validate(
            &json!({"type": "usage_limit", "email_to": "a@b.c", "percentage": 101, "frequency": "weekly"}),
        );
        assert_eq!(attributes(&diagnostics), vec!["percentage", "frequency"]);
        assert!(diagnostics[0].detail.as_deref().unwrap().contains("between 0 and 100"));
    }

    #[test]
    fn test_state_from_alert() {
        let state = AlertState::from(Alert {
            id: 9,
            alert_type: USAGE_LIMIT.into(),
            email_to: "ops@example.com".into(),
            frequency: None,
            percentage: Some(90),
        });
        assert_eq!(
            encode(&state).unwrap(),
            json!({"id": "9", "type": "usage_limit", "email_to": "ops@example.com", "frequency": null, "percentage": 90})
        );
    }
}
