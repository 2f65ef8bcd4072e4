use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{argument, read_only_view, DataSource};
use crate::client::SendGridClient;
use crate::error::ProviderError;
use crate::resources::{
    encode, numeric_id, LinkBrandingResource, LinkBrandingState, Resource,
    SenderAuthenticationResource, SenderAuthenticationState,
};
use crate::schema::Schema;

/// Looks up an authenticated domain by id.
pub struct SenderAuthenticationDataSource;

#[async_trait]
impl DataSource for SenderAuthenticationDataSource {
    fn type_name(&self) -> &'static str {
        "sendgrid_sender_authentication"
    }

    fn schema(&self) -> Schema {
        let mut schema = read_only_view(SenderAuthenticationResource.schema(), Some("id"));
        // Not reported by the API.
        schema.attributes.remove("custom_dkim_selector");
        schema
    }

    #[instrument(skip_all, fields(data_source = "sendgrid_sender_authentication"))]
    async fn read(&self, client: &SendGridClient, config: Value) -> Result<Value, ProviderError> {
        let id = numeric_id(argument(&config, "id")?, self.type_name())?;
        let domain = client.get_domain(id).await?;
        // Report ips as an empty set rather than unset.
        let known = SenderAuthenticationState {
            ips: Some(Vec::new()),
            ..Default::default()
        };
        let mut state = encode(&SenderAuthenticationState::from_api(domain, &known))?;
        if let Value::Object(map) = &mut state {
            map.remove("custom_dkim_selector");
        }
        Ok(state)
    }
}

/// Looks up a branded link domain by id.
pub struct LinkBrandingDataSource;

#[async_trait]
impl DataSource for LinkBrandingDataSource {
    fn type_name(&self) -> &'static str {
        "sendgrid_link_branding"
    }

    fn schema(&self) -> Schema {
        read_only_view(LinkBrandingResource.schema(), Some("id"))
    }

    #[instrument(skip_all, fields(data_source = "sendgrid_link_branding"))]
    async fn read(&self, client: &SendGridClient, config: Value) -> Result<Value, ProviderError> {
        let id = numeric_id(argument(&config, "id")?, self.type_name())?;
        let link = client.get_link(id).await?;
        encode(&LinkBrandingState::from(link))
    }
}
