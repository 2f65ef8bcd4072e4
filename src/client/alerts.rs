// Alert endpoints

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Error, SendGridClient};

/// An alert as reported by SendGrid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Alert id.
    pub id: i64,
    /// `stats_notification` or `usage_limit`.
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Recipient address.
    pub email_to: String,
    /// How often stats are sent. Stats notifications only.
    #[serde(default)]
    pub frequency: Option<String>,
    /// Usage threshold that triggers the alert. Usage limit alerts only.
    #[serde(default)]
    pub percentage: Option<i64>,
}

/// Body for creating or updating an alert. The type cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertRequest {
    /// Alert type. Only sent on create.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    /// Recipient address.
    pub email_to: String,
    /// How often stats are sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    /// Usage threshold in percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
}

impl SendGridClient {
    /// `POST /v3/alerts`
    pub async fn create_alert(&self, request: &AlertRequest) -> Result<Alert, Error> {
        let url = self.endpoint(&["alerts"])?;
        debug!(alert_type = ?request.alert_type, "creating alert");
        self.post(url, request).await
    }

    /// `GET /v3/alerts/{id}`
    pub async fn get_alert(&self, id: i64) -> Result<Alert, Error> {
        let url = self.endpoint(&["alerts", &id.to_string()])?;
        self.get(url).await
    }

    /// `PATCH /v3/alerts/{id}`
    pub async fn update_alert(&self, id: i64, request: &AlertRequest) -> Result<Alert, Error> {
        let url = self.endpoint(&["alerts", &id.to_string()])?;
        debug!(id, "updating alert");
        let body = AlertRequest {
            alert_type: None,
            ..request.clone()
        };
        self.patch(url, &body).await
    }

    /// `DELETE /v3/alerts/{id}`
    pub async fn delete_alert(&self, id: i64) -> Result<(), Error> {
        let url = self.endpoint(&["alerts", &id.to_string()])?;
        debug!(id, "deleting alert");
        self.delete(url).await
    }
}
