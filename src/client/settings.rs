// Account-wide settings endpoints
//
// Each setting is a singleton read with GET and changed with PATCH.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Error, SendGridClient};

/// `mail_settings/bounce_purge`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BouncePurgeSettings {
    /// Whether bounces are purged.
    #[serde(default)]
    pub enabled: bool,
    /// Days to keep soft bounces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_bounces: Option<i64>,
    /// Days to keep hard bounces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_bounces: Option<i64>,
}

/// `user/settings/enforced_tls`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnforcedTlsSettings {
    /// Only deliver to recipients that support TLS.
    #[serde(default)]
    pub require_tls: bool,
    /// Only deliver to recipients with a valid certificate.
    #[serde(default)]
    pub require_valid_cert: bool,
    /// Minimum TLS version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<f64>,
}

/// `tracking_settings/click`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickTrackingSettings {
    /// Whether links are rewritten for click tracking.
    #[serde(default)]
    pub enabled: bool,
    /// Also track links in plain text emails.
    #[serde(default)]
    pub enable_text: bool,
}

impl SendGridClient {
    /// `GET /v3/mail_settings/bounce_purge`
    pub async fn get_bounce_purge(&self) -> Result<BouncePurgeSettings, Error> {
        let url = self.endpoint(&["mail_settings", "bounce_purge"])?;
        self.get(url).await
    }

    /// `PATCH /v3/mail_settings/bounce_purge`
    pub async fn update_bounce_purge(
        &self,
        settings: &BouncePurgeSettings,
    ) -> Result<BouncePurgeSettings, Error> {
        let url = self.endpoint(&["mail_settings", "bounce_purge"])?;
        debug!(enabled = settings.enabled, "updating bounce purge settings");
        self.patch(url, settings).await
    }

    /// `GET /v3/user/settings/enforced_tls`
    pub async fn get_enforced_tls(&self) -> Result<EnforcedTlsSettings, Error> {
        let url = self.endpoint(&["user", "settings", "enforced_tls"])?;
        self.get(url).await
    }

    /// `PATCH /v3/user/settings/enforced_tls`
    pub async fn update_enforced_tls(
        &self,
        settings: &EnforcedTlsSettings,
    ) -> Result<EnforcedTlsSettings, Error> {
        let url = self.endpoint(&["user", "settings", "enforced_tls"])?;
        debug!(require_tls = settings.require_tls, "updating enforced TLS settings");
        self.patch(url, settings).await
    }

    /// `GET /v3/tracking_settings/click`
    pub async fn get_click_tracking(&self) -> Result<ClickTrackingSettings, Error> {
        let url = self.endpoint(&["tracking_settings", "click"])?;
        self.get(url).await
    }

    /// `PATCH /v3/tracking_settings/click`
    pub async fn update_click_tracking(
        &self,
        settings: &ClickTrackingSettings,
    ) -> Result<ClickTrackingSettings, Error> {
        let url = self.endpoint(&["tracking_settings", "click"])?;
        debug!(enabled = settings.enabled, "updating click tracking settings");
        self.patch(url, settings).await
    }
}
