use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{argument, read_only_view, DataSource};
use crate::client::SendGridClient;
use crate::error::ProviderError;
use crate::resources::{encode, numeric_id, AlertResource, AlertState, Resource};
use crate::schema::Schema;

const TYPE_NAME: &str = "sendgrid_alert";

/// Looks up an alert by id.
pub struct AlertDataSource;

#[async_trait]
impl DataSource for AlertDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only_view(AlertResource.schema(), Some("id"))
    }

    #[instrument(skip_all, fields(data_source = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, config: Value) -> Result<Value, ProviderError> {
        let id = numeric_id(argument(&config, "id")?, TYPE_NAME)?;
        let alert = client.get_alert(id).await?;
        encode(&AlertState::from(alert))
    }
}
