use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{argument, read_only_view, DataSource};
use crate::client::SendGridClient;
use crate::error::ProviderError;
use crate::resources::{
    encode, lookup_teammate, reported_scopes, Membership, Resource, TeammateResource,
    TeammateState,
};
use crate::schema::Schema;

const TYPE_NAME: &str = "sendgrid_teammate";

/// Looks up a teammate or pending invite by email.
pub struct TeammateDataSource;

#[async_trait]
impl DataSource for TeammateDataSource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        read_only_view(TeammateResource.schema(), Some("email"))
    }

    #[instrument(skip_all, fields(data_source = TYPE_NAME))]
    async fn read(&self, client: &SendGridClient, config: Value) -> Result<Value, ProviderError> {
        let email = argument(&config, "email")?;
        let seed = TeammateState::default();

        // Nothing is configured here, so admins report SendGrid's scopes.
        let state = match lookup_teammate(client, email).await? {
            Some(Membership::Accepted(teammate)) => {
                let scopes = reported_scopes(teammate.scopes.clone(), None);
                TeammateState {
                    scopes: Some(scopes),
                    ..seed.accepted(teammate)
                }
            }
            Some(Membership::Pending(invite)) => {
                let scopes = reported_scopes(invite.scopes.clone(), None);
                TeammateState {
                    scopes: Some(scopes),
                    ..seed.invited(invite)
                }
            }
            None => {
                return Err(ProviderError::NotFound(format!(
                    "no teammate or pending invite for {}",
                    email
                )))
            }
        };
        encode(&state)
    }
}
