//! Managed resources.
//!
//! Each resource maps one SendGrid object onto a typed state struct and
//! implements [`Resource`]. The provider keeps them in a registry keyed by
//! [`Resource::type_name`] and dispatches protocol calls to them.

mod alert;
mod api_key;
mod link_branding;
mod sender_authentication;
mod settings;
mod teammate;
mod validation;

pub use alert::AlertResource;
pub use api_key::ApiKeyResource;
pub use link_branding::LinkBrandingResource;
pub use sender_authentication::SenderAuthenticationResource;
pub use settings::{BounceSettingsResource, ClickTrackingSettingsResource, EnforcedTlsSettingsResource};
pub use teammate::TeammateResource;
pub use validation::{LinkBrandingValidationResource, SenderAuthenticationValidationResource};

pub(crate) use alert::AlertState;
pub(crate) use api_key::ApiKeyState;
pub(crate) use link_branding::LinkBrandingState;
pub(crate) use sender_authentication::SenderAuthenticationState;
pub(crate) use settings::{BounceSettingsState, ClickTrackingSettingsState, EnforcedTlsSettingsState};
pub(crate) use teammate::{lookup_teammate, Membership, TeammateState};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::client::{self, SendGridClient};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};

/// A resource type with a full create/read/update/delete lifecycle.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The type name used in configuration, e.g. `sendgrid_alert`.
    fn type_name(&self) -> &'static str;

    /// The schema of this resource.
    fn schema(&self) -> Schema;

    /// Checks that span attributes or depend on values. Schema validation has
    /// already passed when this runs.
    fn validate(&self, _config: &Value) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Create the remote object and return the new state.
    async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError>;

    /// Refresh state from SendGrid. Returns `None` when the object is gone.
    async fn read(&self, client: &SendGridClient, state: Value)
        -> Result<Option<Value>, ProviderError>;

    /// Apply an in-place update and return the new state.
    async fn update(
        &self,
        client: &SendGridClient,
        prior: Value,
        planned: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the remote object. Deleting an object that is already gone succeeds.
    async fn delete(&self, client: &SendGridClient, state: Value) -> Result<(), ProviderError>;

    /// Build the state an import starts from. Only the id is known; every
    /// other attribute is left out so typed state takes its default.
    fn import_seed(&self, id: &str) -> Value {
        json!({ "id": id })
    }

    /// Import an existing object by id.
    async fn import(&self, client: &SendGridClient, id: &str) -> Result<Value, ProviderError> {
        let seed = self.import_seed(id);
        self.read(client, seed).await?.ok_or_else(|| {
            ProviderError::NotFound(format!("{} {:?} does not exist", self.type_name(), id))
        })
    }
}

/// Every resource this provider manages.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(ApiKeyResource),
        Box::new(AlertResource),
        Box::new(TeammateResource),
        Box::new(SenderAuthenticationResource),
        Box::new(LinkBrandingResource),
        Box::new(SenderAuthenticationValidationResource),
        Box::new(LinkBrandingValidationResource),
        Box::new(BounceSettingsResource),
        Box::new(EnforcedTlsSettingsResource),
        Box::new(ClickTrackingSettingsResource),
    ]
}

/// Decode a state or configuration object into its typed form.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ProviderError> {
    Ok(serde_json::from_value(value)?)
}

/// Encode typed state back into a JSON object.
pub(crate) fn encode<T: Serialize>(state: &T) -> Result<Value, ProviderError> {
    Ok(serde_json::to_value(state)?)
}

/// Map a SendGrid 404 to `None`.
pub(crate) fn found<T>(result: Result<T, client::Error>) -> Result<Option<T>, ProviderError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Treat deleting an object that no longer exists as success.
pub(crate) fn gone_ok(result: Result<(), client::Error>) -> Result<(), ProviderError> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => Ok(other?),
    }
}

/// The `id` of a state, required for every operation after create.
pub(crate) fn require_id(id: Option<&str>, type_name: &str) -> Result<String, ProviderError> {
    id.filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Validation(format!("{} state has no id", type_name)))
}

/// Parse a numeric SendGrid id.
pub(crate) fn numeric_id(id: &str, type_name: &str) -> Result<i64, ProviderError> {
    id.parse().map_err(|_| {
        ProviderError::Validation(format!("{} id must be numeric, got {:?}", type_name, id))
    })
}

/// Scopes SendGrid attaches to keys and teammates on its own.
const IMPLICIT_SCOPES: [&str; 2] = ["2fa_exempt", "2fa_required"];

/// Sort reported scopes and drop the implicit ones the configuration did not ask for.
pub(crate) fn reported_scopes(reported: Vec<String>, configured: Option<&[String]>) -> Vec<String> {
    let mut scopes: Vec<String> = reported
        .into_iter()
        .filter(|scope| {
            !IMPLICIT_SCOPES.contains(&scope.as_str())
                || configured.is_some_and(|c| c.contains(scope))
        })
        .collect();
    scopes.sort();
    scopes.dedup();
    scopes
}
