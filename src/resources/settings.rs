// Account-wide singleton settings.
//
// There is exactly one of each setting per account, so the id is fixed,
// create and update both PATCH, import accepts any id and delete puts the
// setting back to its default.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{decode, encode, Resource};
use crate::client::{
    BouncePurgeSettings, ClickTrackingSettings, EnforcedTlsSettings, SendGridClient,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

pub(crate) const BOUNCE_PURGE_ID: &str = "bounce_purge";
pub(crate) const ENFORCED_TLS_ID: &str = "enforced_tls";
pub(crate) const CLICK_TRACKING_ID: &str = "click_tracking";

/// Bounce retention bounds, in days.
const BOUNCE_DAYS: std::ops::RangeInclusive<i64> = 1..=3650;

pub(crate) const TLS_VERSIONS: [f64; 3] = [1.1, 1.2, 1.3];
const DEFAULT_TLS_VERSION: f64 = 1.1;

fn fixed_id(description: &str) -> Attribute {
    Attribute::computed_string().with_description(description.to_string())
}

// ── Bounce purge ─────────────────────────────────────────────────────

/// `sendgrid_bounce_settings` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct BounceSettingsState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub soft_bounces: Option<i64>,
    #[serde(default)]
    pub hard_bounces: Option<i64>,
}

impl From<BouncePurgeSettings> for BounceSettingsState {
    fn from(settings: BouncePurgeSettings) -> Self {
        Self {
            id: Some(BOUNCE_PURGE_ID.to_string()),
            enabled: Some(settings.enabled),
            soft_bounces: settings.soft_bounces,
            hard_bounces: settings.hard_bounces,
        }
    }
}

/// How long SendGrid keeps soft and hard bounces before purging them.
pub struct BounceSettingsResource;

impl BounceSettingsResource {
    async fn apply(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: BounceSettingsState = decode(planned)?;
        let request = BouncePurgeSettings {
            enabled: planned.enabled.unwrap_or(true),
            soft_bounces: planned.soft_bounces,
            hard_bounces: planned.hard_bounces,
        };
        let applied = client.update_bounce_purge(&request).await?;
        info!(enabled = applied.enabled, "applied bounce settings");
        encode(&BounceSettingsState::from(BouncePurgeSettings {
            // Values the response leaves out were accepted as sent.
            soft_bounces: applied.soft_bounces.or(request.soft_bounces),
            hard_bounces: applied.hard_bounces.or(request.hard_bounces),
            ..applied
        }))
    }
}

#[async_trait]
impl Resource for BounceSettingsResource {
    fn type_name(&self) -> &'static str {
        "sendgrid_bounce_settings"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Bounce purge settings")
            .with_attribute("id", fixed_id("Always bounce_purge"))
            .with_attribute(
                "enabled",
                Attribute::optional_bool().with_default(Value::Bool(true)),
            )
            .with_attribute(
                "soft_bounces",
                Attribute::new(AttributeType::Int64, AttributeFlags::optional_computed())
                    .with_description("Days to keep soft bounces, 1 to 3650"),
            )
            .with_attribute(
                "hard_bounces",
                Attribute::new(AttributeType::Int64, AttributeFlags::optional_computed())
                    .with_description("Days to keep hard bounces, 1 to 3650"),
            )
    }

    fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        ["soft_bounces", "hard_bounces"]
            .into_iter()
            .filter_map(|name| {
                let days = config.get(name)?.as_i64()?;
                (!BOUNCE_DAYS.contains(&days)).then(|| {
                    Diagnostic::error(format!("Invalid {}", name))
                        .with_detail(format!(
                            "{} must be between {} and {} days, got {}",
                            name,
                            BOUNCE_DAYS.start(),
                            BOUNCE_DAYS.end(),
                            days
                        ))
                        .with_attribute(name)
                })
            })
            .collect()
    }

    fn import_seed(&self, _id: &str) -> Value {
        json!({"id": BOUNCE_PURGE_ID})
    }

    #[instrument(skip_all, fields(resource = "sendgrid_bounce_settings"))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    #[instrument(skip_all, fields(resource = "sendgrid_bounce_settings"))]
    async fn read(&self, client: &SendGridClient, _state: Value) -> Result<Option<Value>, ProviderError> {
        let settings = client.get_bounce_purge().await?;
        Ok(Some(encode(&BounceSettingsState::from(settings))?))
    }

    async fn update(
        &self,
        client: &SendGridClient,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    #[instrument(skip_all, fields(resource = "sendgrid_bounce_settings"))]
    async fn delete(&self, client: &SendGridClient, _state: Value) -> Result<(), ProviderError> {
        client
            .update_bounce_purge(&BouncePurgeSettings::default())
            .await?;
        info!("disabled bounce purge");
        Ok(())
    }
}

// ── Enforced TLS ─────────────────────────────────────────────────────

/// `sendgrid_enforced_tls_settings` state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct EnforcedTlsSettingsState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub require_tls: Option<bool>,
    #[serde(default)]
    pub require_valid_cert: Option<bool>,
    #[serde(default)]
    pub version: Option<f64>,
}

impl From<EnforcedTlsSettings> for EnforcedTlsSettingsState {
    fn from(settings: EnforcedTlsSettings) -> Self {
        Self {
            id: Some(ENFORCED_TLS_ID.to_string()),
            require_tls: Some(settings.require_tls),
            require_valid_cert: Some(settings.require_valid_cert),
            version: Some(settings.version.unwrap_or(DEFAULT_TLS_VERSION)),
        }
    }
}

fn enforced_tls_defaults() -> EnforcedTlsSettings {
    EnforcedTlsSettings {
        require_tls: false,
        require_valid_cert: false,
        version: Some(DEFAULT_TLS_VERSION),
    }
}

/// Whether recipients must support TLS, and which version.
pub struct EnforcedTlsSettingsResource;

impl EnforcedTlsSettingsResource {
    async fn apply(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: EnforcedTlsSettingsState = decode(planned)?;
        let request = EnforcedTlsSettings {
            require_tls: planned.require_tls.unwrap_or(false),
            require_valid_cert: planned.require_valid_cert.unwrap_or(false),
            version: Some(planned.version.unwrap_or(DEFAULT_TLS_VERSION)),
        };
        let applied = client.update_enforced_tls(&request).await?;
        info!(require_tls = applied.require_tls, "applied enforced TLS settings");
        encode(&EnforcedTlsSettingsState::from(EnforcedTlsSettings {
            version: applied.version.or(request.version),
            ..applied
        }))
    }
}

#[async_trait]
impl Resource for EnforcedTlsSettingsResource {
    fn type_name(&self) -> &'static str {
        "sendgrid_enforced_tls_settings"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Enforced TLS settings")
            .with_attribute("id", fixed_id("Always enforced_tls"))
            .with_attribute(
                "require_tls",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("Only deliver to recipients that support TLS"),
            )
            .with_attribute(
                "require_valid_cert",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("Only deliver to recipients with a valid certificate"),
            )
            .with_attribute(
                "version",
                Attribute::optional_float64()
                    .with_default(json!(DEFAULT_TLS_VERSION))
                    .with_allowed_values(TLS_VERSIONS)
                    .with_description("Minimum TLS version"),
            )
    }

    fn import_seed(&self, _id: &str) -> Value {
        json!({"id": ENFORCED_TLS_ID})
    }

    #[instrument(skip_all, fields(resource = "sendgrid_enforced_tls_settings"))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    #[instrument(skip_all, fields(resource = "sendgrid_enforced_tls_settings"))]
    async fn read(&self, client: &SendGridClient, _state: Value) -> Result<Option<Value>, ProviderError> {
        let settings = client.get_enforced_tls().await?;
        Ok(Some(encode(&EnforcedTlsSettingsState::from(settings))?))
    }

    async fn update(
        &self,
        client: &SendGridClient,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    #[instrument(skip_all, fields(resource = "sendgrid_enforced_tls_settings"))]
    async fn delete(&self, client: &SendGridClient, _state: Value) -> Result<(), ProviderError> {
        client.update_enforced_tls(&enforced_tls_defaults()).await?;
        info!("reset enforced TLS settings");
        Ok(())
    }
}

// ── Click tracking ───────────────────────────────────────────────────

/// `sendgrid_click_tracking_settings` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ClickTrackingSettingsState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub enable_text: Option<bool>,
}

impl From<ClickTrackingSettings> for ClickTrackingSettingsState {
    fn from(settings: ClickTrackingSettings) -> Self {
        Self {
            id: Some(CLICK_TRACKING_ID.to_string()),
            enabled: Some(settings.enabled),
            enable_text: Some(settings.enable_text),
        }
    }
}

/// Link rewriting for click tracking.
pub struct ClickTrackingSettingsResource;

impl ClickTrackingSettingsResource {
    async fn apply(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: ClickTrackingSettingsState = decode(planned)?;
        let request = ClickTrackingSettings {
            enabled: planned.enabled.unwrap_or(false),
            enable_text: planned.enable_text.unwrap_or(false),
        };
        let applied = client.update_click_tracking(&request).await?;
        info!(enabled = applied.enabled, "applied click tracking settings");
        encode(&ClickTrackingSettingsState::from(applied))
    }
}

#[async_trait]
impl Resource for ClickTrackingSettingsResource {
    fn type_name(&self) -> &'static str {
        "sendgrid_click_tracking_settings"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("Click tracking settings")
            .with_attribute("id", fixed_id("Always click_tracking"))
            .with_attribute("enabled", Attribute::required_bool())
            .with_attribute(
                "enable_text",
                Attribute::optional_bool()
                    .with_default(Value::Bool(false))
                    .with_description("Also track links in plain text emails"),
            )
    }

    fn import_seed(&self, _id: &str) -> Value {
        json!({"id": CLICK_TRACKING_ID})
    }

    #[instrument(skip_all, fields(resource = "sendgrid_click_tracking_settings"))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    #[instrument(skip_all, fields(resource = "sendgrid_click_tracking_settings"))]
    async fn read(&self, client: &SendGridClient, _state: Value) -> Result<Option<Value>, ProviderError> {
        let settings = client.get_click_tracking().await?;
        Ok(Some(encode(&ClickTrackingSettingsState::from(settings))?))
    }

    async fn update(
        &self,
        client: &SendGridClient,
        _prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError> {
        self.apply(client, planned).await
    }

    #[instrument(skip_all, fields(resource = "sendgrid_click_tracking_settings"))]
    async fn delete(&self, client: &SendGridClient, _state: Value) -> Result<(), ProviderError> {
        client
            .update_click_tracking(&ClickTrackingSettings::default())
            .await?;
        info!("disabled click tracking");
        Ok(())
    }
}
