//! Data sources: read-only views of SendGrid objects.
//!
//! Each data source reuses the state mapping of the matching resource and
//! exposes it with every attribute computed except the lookup argument.
//! Unlike a resource read, a missing object is an error.

mod alert;
mod api_key;
mod settings;
mod teammate;
mod whitelabel;

pub use alert::AlertDataSource;
pub use api_key::ApiKeyDataSource;
pub use settings::{
    BounceSettingsDataSource, ClickTrackingSettingsDataSource, EnforcedTlsSettingsDataSource,
};
pub use teammate::TeammateDataSource;
pub use whitelabel::{LinkBrandingDataSource, SenderAuthenticationDataSource};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::SendGridClient;
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, Diagnostic, Schema};

/// A read-only data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The type name used in configuration, e.g. `sendgrid_alert`.
    fn type_name(&self) -> &'static str;

    /// The schema of this data source.
    fn schema(&self) -> Schema;

    /// Checks beyond the schema.
    fn validate(&self, _config: &Value) -> Vec<Diagnostic> {
        Vec::new()
    }

    /// Look the object up and return its state.
    async fn read(&self, client: &SendGridClient, config: Value) -> Result<Value, ProviderError>;
}

/// Every data source this provider offers.
pub fn all() -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(ApiKeyDataSource),
        Box::new(AlertDataSource),
        Box::new(TeammateDataSource),
        Box::new(SenderAuthenticationDataSource),
        Box::new(LinkBrandingDataSource),
        Box::new(BounceSettingsDataSource),
        Box::new(EnforcedTlsSettingsDataSource),
        Box::new(ClickTrackingSettingsDataSource),
    ]
}

/// A resource schema with every attribute computed and `argument`, when
/// given, as the one required string.
pub(crate) fn read_only_view(resource: Schema, argument: Option<&str>) -> Schema {
    let mut view = Schema::new(resource.version);
    view.description = resource.description;
    for (name, attr) in resource.attributes {
        let mut flags = AttributeFlags::computed();
        flags.sensitive = attr.flags.sensitive;
        let mut computed = Attribute::new(attr.attr_type, flags);
        computed.description = attr.description;
        view.attributes.insert(name, computed);
    }
    if let Some(argument) = argument {
        view.attributes
            .insert(argument.to_string(), Attribute::required_string());
    }
    view
}

/// The required lookup argument of a data source.
pub(crate) fn argument<'a>(config: &'a Value, name: &str) -> Result<&'a str, ProviderError> {
    config
        .get(name)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("{} is required", name)))
}
