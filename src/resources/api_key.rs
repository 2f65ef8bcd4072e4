use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use super::{decode, encode, found, gone_ok, reported_scopes, require_id, Resource};
use crate::client::{ApiKey, SendGridClient};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Schema};

const TYPE_NAME: &str = "sendgrid_api_key";

/// `sendgrid_api_key` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ApiKeyState {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scopes: Option<Vec<String>>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ApiKeyState {
    /// State for a key as SendGrid reports it. `secret` is the value already
    /// known, since SendGrid only returns it on create.
    pub(crate) fn from_api(key: ApiKey, configured: Option<&[String]>, secret: Option<String>) -> Self {
        Self {
            id: Some(key.api_key_id),
            name: key.name,
            scopes: Some(reported_scopes(key.scopes, configured)),
            api_key: key.api_key.or(secret),
        }
    }
}

/// API keys. The secret is only known right after creation.
pub struct ApiKeyResource;

#[async_trait]
impl Resource for ApiKeyResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("An API key")
            .with_attribute("id", Attribute::computed_string().with_description("API key id"))
            .with_attribute("name", Attribute::required_string().with_description("Key name"))
            .with_attribute(
                "scopes",
                Attribute::string_set(AttributeFlags::optional_computed())
                    .with_description("Permissions granted to the key. Full access when unset"),
            )
            .with_attribute(
                "api_key",
                Attribute::computed_string()
                    .sensitive()
                    .with_description("The secret, only available after creation"),
            )
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
        let planned: ApiKeyState = decode(planned)?;
        let key = client
            .create_api_key(&planned.name, planned.scopes.as_deref())
            .await?;
        info!(id = %key.api_key_id, "created api key");
        encode(&ApiKeyState::from_api(key, planned.scopes.as_deref(), None))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, state: Value) -> Result<Option<Value>, ProviderError> {
        let state: ApiKeyState = decode(state)?;
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        match found(client.get_api_key(&id).await)? {
            Some(key) => Ok(Some(encode(&ApiKeyState::from_api(
                key,
                state.scopes.as_deref(),
                state.api_key,
            ))?)),
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
        let prior: ApiKeyState = decode(prior)?;
        let planned: ApiKeyState = decode(planned)?;
        let id = require_id(prior.id.as_deref(), TYPE_NAME)?;
        let key = client
            .update_api_key(&id, &planned.name, planned.scopes.as_deref())
            .await?;
        encode(&ApiKeyState::from_api(key, planned.scopes.as_deref(), prior.api_key))
    }

    #[instrument(skip_all, fields(resource = TYPE_NAME))]
    async fn delete(&self, client: &SendGridClient, state: Value) -> Result<(), ProviderError> {
        let state: ApiKeyState = decode(state)?;
        let id = require_id(state.id.as_deref(), TYPE_NAME)?;
        gone_ok(client.delete_api_key(&id).await)?;
        info!(%id, "deleted api key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_from_api_keeps_known_secret() {
        let key = ApiKey {
            api_key_id: "abc".into(),
            name: "ci".into(),
            scopes: vec!["mail.send".into(), "2fa_required".into()],
            api_key: None,
        };
        let state = ApiKeyState::from_api(key, None, Some("SG.secret".into()));

        assert_eq!(state.id.as_deref(), Some("abc"));
        assert_eq!(state.scopes, Some(vec!["mail.send".to_string()]));
        assert_eq!(state.api_key.as_deref(), Some("SG.secret"));
    }

    #[test]
    fn test_state_encodes_every_attribute() {
        let state = encode(&ApiKeyState::default()).unwrap();
        let keys: BTreeSet<_> = state.as_object().unwrap().keys().cloned().collect();
        let schema: BTreeSet<_> = ApiKeyResource.schema().attributes.keys().cloned().collect();
        assert_eq!(keys, schema);
    }
}
