use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{argument, read_only_view, DataSource};
use crate::client::SendGridClient;
use crate::error::ProviderError;
use crate::resources::{encode, ApiKeyResource, ApiKeyState, Resource};
use crate::schema::Schema;

const TYPE_NAME: &str = "sendgrid_api_key";

/// Looks up an API key by id. The secret is never available here.
pub struct ApiKeyDataSource;

#[async_trait]
impl DataSource for ApiKeyDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        let mut schema = read_only_view(ApiKeyResource.schema(), Some("api_key_id"));
        schema.attributes.remove("api_key");
        schema
    }

    #[instrument(skip_all, fields(data_source = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, config: Value) -> Result<Value, ProviderError> {
        let id = argument(&config, "api_key_id")?;
        let key = client.get_api_key(id).await?;

        let mut state = encode(&ApiKeyState::from_api(key, None, None))?;
        if let Value::Object(map) = &mut state {
            map.remove("api_key");
            map.insert("api_key_id".to_string(), Value::String(id.to_string()));
        }
        Ok(state)
    }
}
