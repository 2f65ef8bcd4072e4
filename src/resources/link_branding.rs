use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::sender_authentication::{dns_record_type, dns_records, DnsRecordState};
use super::{decode, encode, found, gone_ok, numeric_id, require_id, Resource};
use crate::client::{BrandedLink, NewBrandedLink, SendGridClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};

const TYPE_NAME: &str = "sendgrid_link_branding";

/// `sendgrid_link_branding` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LinkBrandingState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub valid: Option<bool>,
    #[serde(default)]
    pub dns: Option<Vec<DnsRecordState>>,
}

impl From<BrandedLink> for LinkBrandingState {
    fn from(link: BrandedLink) -> Self {
        Self {
            id: Some(link.id.to_string()),
            domain: link.domain,
            subdomain: link.subdomain,
            is_default: Some(link.is_default),
            valid: Some(link.valid),
            dns: Some(dns_records(link.dns)),
        }
    }
}

/// Branded tracking links.
pub struct LinkBrandingResource;

#[async_trait]
impl Resource for LinkBrandingResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("A branded domain for tracked links")
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("domain", Attribute::required_string().with_force_new())
            .with_attribute(
                "subdomain",
                Attribute::optional_computed_string().with_force_new(),
            )
            .with_attribute(
                "is_default",
                Attribute::optional_bool().with_default(Value::Bool(false)),
            )
            .with_attribute("valid", Attribute::computed_bool())
            .with_attribute(
                "dns",
                Attribute::new(AttributeType::list(dns_record_type()), AttributeFlags::computed()),
            )
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: LinkBrandingState = decode(planned)?;
        let link = client
            .create_link(&NewBrandedLink {
                domain: planned.domain,
                subdomain: planned.subdomain,
                is_default: planned.is_default.unwrap_or(false),
            })
            .await?;
        info!(id = link.id, domain = %link.domain, "branded link domain");
        encode(&LinkBrandingState::from(link))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, state: Value) -> Result<Option<Value>, ProviderError> {
        let state: LinkBrandingState = decode(state)?;
        let id = numeric_id(&require_id(state.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        match found(client.get_link(id).await)? {
            Some(link) => Ok(Some(encode(&LinkBrandingState::from(link))?)),
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
        let prior: LinkBrandingState = decode(prior)?;
        let planned: LinkBrandingState = decode(planned)?;
        let id = numeric_id(&require_id(prior.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        let link = client
            .update_link(id, planned.is_default.unwrap_or(false))
            .await?;
        encode(&LinkBrandingState::from(link))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, client: &SendGridClient, state: Value) -> Result<(), ProviderError> {
        let state: LinkBrandingState = decode(state)?;
        let id = numeric_id(&require_id(state.id.as_deref(), TYPE_NAME)?, TYPE_NAME)?;
        gone_ok(client.delete_link(id).await)?;
        info!(id, "deleted branded link");
        Ok(())
    }
}
