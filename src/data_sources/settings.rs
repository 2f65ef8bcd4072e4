use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{read_only_view, DataSource};
use crate::client::SendGridClient;
use crate::error::ProviderError;
use crate::resources::{
    encode, BounceSettingsResource, BounceSettingsState, ClickTrackingSettingsResource,
    ClickTrackingSettingsState, EnforcedTlsSettingsResource, EnforcedTlsSettingsState, Resource,
};
use crate::schema::Schema;

/// Current bounce purge settings.
pub struct BounceSettingsDataSource;

#[async_trait]
impl DataSource for BounceSettingsDataSource {
    fn type_name(&self) -> &'static str {
        "sendgrid_bounce_settings"
    }

    fn schema(&self) -> Schema {
        read_only_view(BounceSettingsResource.schema(), None)
    }

    #[instrument(skip_all, fields(data_source = "sendgrid_bounce_settings"))]
    async fn read(&self, client: &SendGridClient, _config: Value) -> Result<Value, ProviderError> {
        encode(&BounceSettingsState::from(client.get_bounce_purge().await?))
    }
}

/// Current enforced TLS settings.
pub struct EnforcedTlsSettingsDataSource;

#[async_trait]
impl DataSource for EnforcedTlsSettingsDataSource {
    fn type_name(&self) -> &'static str {
        "sendgrid_enforced_tls_settings"
    }

    fn schema(&self) -> Schema {
        read_only_view(EnforcedTlsSettingsResource.schema(), None)
    }

    #[instrument(skip_all, fields(data_source = "sendgrid_enforced_tls_settings"))]
    async fn read(&self, client: &SendGridClient, _config: Value) -> Result<Value, ProviderError> {
        encode(&EnforcedTlsSettingsState::from(client.get_enforced_tls().await?))
    }
}

/// Current click tracking settings.
pub struct ClickTrackingSettingsDataSource;

#[async_trait]
impl DataSource for ClickTrackingSettingsDataSource {
    fn type_name(&self) -> &'static str {
        "sendgrid_click_tracking_settings"
    }

    fn schema(&self) -> Schema {
        read_only_view(ClickTrackingSettingsResource.schema(), None)
    }

    #[instrument(skip_all, fields(data_source = "sendgrid_click_tracking_settings"))]
    async fn read(&self, client: &SendGridClient, _config: Value) -> Result<Value, ProviderError> {
        encode(&ClickTrackingSettingsState::from(client.get_click_tracking().await?))
    }
}
