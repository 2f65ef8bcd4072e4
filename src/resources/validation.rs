// Resources that trigger SendGrid's DNS verification for a sender
// authentication or link branding. Creation fails until the records check out.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use super::{found, numeric_id, Resource};
use crate::client::{SendGridClient, ValidationResult};
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// What is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    SenderAuthentication,
    LinkBranding,
}

impl Target {
    fn type_name(self) -> &'static str {
        match self {
            Self::SenderAuthentication => "sendgrid_sender_authentication_validation",
            Self::LinkBranding => "sendgrid_link_branding_validation",
        }
    }

    /// The attribute holding the id of the validated object.
    fn reference(self) -> &'static str {
        match self {
            Self::SenderAuthentication => "sender_authentication_id",
            Self::LinkBranding => "link_branding_id",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Self::SenderAuthentication => "sender authentication",
            Self::LinkBranding => "link branding",
        }
    }

    fn schema(self) -> Schema {
        Schema::v0()
            .with_description(format!("Verifies the DNS records of a {}", self.noun()))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(self.reference(), Attribute::required_string().with_force_new())
            .with_attribute("valid", Attribute::computed_bool())
    }

    fn target_id(self, state: &Value) -> Result<(String, i64), ProviderError> {
        let raw = state
            .get(self.reference())
            .and_then(Value::as_str)
            .or_else(|| state.get("id").and_then(Value::as_str))
            .ok_or_else(|| {
                ProviderError::Validation(format!("{} is required", self.reference()))
            })?;
        Ok((raw.to_string(), numeric_id(raw, self.type_name())?))
    }

    fn state(self, id: &str, valid: bool) -> Value {
        let mut state = Map::new();
        state.insert("id".into(), Value::String(id.to_string()));
        state.insert(self.reference().into(), Value::String(id.to_string()));
        state.insert("valid".into(), Value::Bool(valid));
        Value::Object(state)
    }

    async fn run(self, client: &SendGridClient, id: i64) -> Result<ValidationResult, ProviderError> {
        Ok(match self {
            Self::SenderAuthentication => client.validate_domain(id).await?,
            Self::LinkBranding => client.validate_link(id).await?,
        })
    }

    async fn is_valid(self, client: &SendGridClient, id: i64) -> Result<Option<bool>, ProviderError> {
        Ok(match self {
            Self::SenderAuthentication => found(client.get_domain(id).await)?.map(|d| d.valid),
            Self::LinkBranding => found(client.get_link(id).await)?.map(|l| l.valid),
        })
    }

    #[instrument(skip_all, fields(resource = self.type_name()))]
    async fn validate(self, client: &SendGridClient, state: &Value) -> Result<Value, ProviderError> {
        let (raw, id) = self.target_id(state)?;
        let result = self.run(client, id).await?;
        if !result.valid {
            let reasons: Vec<String> = result
                .failures()
                .into_iter()
                .map(|(record, reason)| format!("{}: {}", record, reason))
                .collect();
            warn!(id, failures = reasons.len(), "DNS validation failed");
            return Err(ProviderError::FailedPrecondition(format!(
                "{} {} is not valid yet: {}",
                self.noun(),
                raw,
                if reasons.is_empty() {
                    "no record details reported".to_string()
                } else {
                    reasons.join("; ")
                }
            )));
        }
        info!(id, "DNS records validated");
        Ok(self.state(&raw, true))
    }
}

macro_rules! validation_resource {
    ($(#[$doc:meta])* $name:ident, $target:expr) => {
        $(#[$doc])*
        pub struct $name;

        #[async_trait]
        impl Resource for $name {
            fn type_name(&self) -> &'static str {
                $target.type_name()
            }

            fn schema(&self) -> Schema {
                $target.schema()
            }

            async fn create(&self, client: &SendGridClient, planned: Value) -> Result<Value, ProviderError> {
                $target.validate(client, &planned).await
            }

            async fn read(&self, client: &SendGridClient, state: Value) -> Result<Option<Value>, ProviderError> {
                let (raw, id) = $target.target_id(&state)?;
                Ok($target
                    .is_valid(client, id)
                    .await?
                    .map(|valid| $target.state(&raw, valid)))
            }

            async fn update(
                &self,
                client: &SendGridClient,
                _prior: Value,
                planned: Value,
            ) -> Result<Value, ProviderError> {
                $target.validate(client, &planned).await
            }

            async fn delete(&self, _client: &SendGridClient, _state: Value) -> Result<(), ProviderError> {
                Ok(())
            }
        }
    };
}

validation_resource!(
    /// Verifies an authenticated domain's DNS records.
    SenderAuthenticationValidationResource,
    Target::SenderAuthentication
);

validation_resource!(
    /// Verifies a branded link domain's DNS records.
    LinkBrandingValidationResource,
    Target::LinkBranding
);
