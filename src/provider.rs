//! The SendGrid provider.
//!
//! [`SendGridProvider`] owns the resource and data source registries and the
//! configured API client, and dispatches protocol calls by type name.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::client::SendGridClient;
use crate::config::ProviderConfig;
use crate::data_sources::{self, DataSource};
use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::resources::{self, Resource};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};
use crate::validation;

/// Provider for SendGrid account configuration.
pub struct SendGridProvider {
    resources: BTreeMap<&'static str, Box<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Box<dyn DataSource>>,
    client: RwLock<Option<Arc<SendGridClient>>>,
}

impl SendGridProvider {
    /// An unconfigured provider with every resource and data source registered.
    pub fn new() -> Self {
        Self {
            resources: resources::all()
                .into_iter()
                .map(|r| (r.type_name(), r))
                .collect(),
            data_sources: data_sources::all()
                .into_iter()
                .map(|d| (d.type_name(), d))
                .collect(),
            client: RwLock::new(None),
        }
    }

    /// A provider that is already configured with `client`.
    pub fn with_client(client: SendGridClient) -> Self {
        let provider = Self::new();
        Self {
            client: RwLock::new(Some(Arc::new(client))),
            ..provider
        }
    }

    fn resource(&self, type_name: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(type_name)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(type_name)
            .map(|d| d.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    async fn client(&self) -> Result<Arc<SendGridClient>, ProviderError> {
        self.client.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration("the provider has not been configured".to_string())
        })
    }
}

impl Default for SendGridProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProviderService for SendGridProvider {
    fn schema(&self) -> ProviderSchema {
        let schema = ProviderSchema::new().with_provider_config(ProviderConfig::schema());
        let schema = self
            .resources
            .values()
            .fold(schema, |schema, r| schema.with_resource(r.type_name(), r.schema()));
        self.data_sources
            .values()
            .fold(schema, |schema, d| schema.with_data_source(d.type_name(), d.schema()))
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&ProviderConfig::schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(ProviderConfig::validate(&config));
        }
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = self.validate_provider_config(config.clone()).await?;
        if has_errors(&diagnostics) {
            return Ok(diagnostics);
        }

        let resolved = ProviderConfig::from_config(&config)?;
        let client = SendGridClient::new(&resolved)?;
        info!(host = %resolved.host, subuser = ?resolved.subuser, "configured SendGrid client");

        *self.client.write().await = Some(Arc::new(client));
        Ok(diagnostics)
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let mut diagnostics = validation::validate(&resource.schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(resource.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type)?;
        let prior = prior_state.as_ref().filter(|prior| !prior.is_null());
        let plan = plan_resource(&resource.schema(), prior, &proposed_state);
        debug!(
            %resource_type,
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "planned"
        );
        Ok(plan)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.create(&client, planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        Ok(resource
            .read(&client, current_state)
            .await?
            .unwrap_or(Value::Null))
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.update(&client, prior_state, planned_state).await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        resource.delete(&client, current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.resource(resource_type)?;
        let client = self.client().await?;
        let state = resource.import(&client, id).await?;
        Ok(vec![ImportedResource::new(resource_type, state)])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let mut diagnostics = validation::validate(&data_source.schema(), &config);
        if !has_errors(&diagnostics) {
            diagnostics.extend(data_source.validate(&config));
        }
        Ok(diagnostics)
    }

    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        let client = self.client().await?;
        data_source.read(&client, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_registers_everything() {
        let schema = SendGridProvider::new().schema();
        assert_eq!(schema.resources.len(), 10);
        assert_eq!(schema.data_sources.len(), 8);
        assert!(schema.provider.attribute("api_key").unwrap().flags.sensitive);
        assert!(schema.resources.contains_key("sendgrid_bounce_settings"));
        assert!(schema.data_sources.contains_key("sendgrid_teammate"));
    }

    #[test]
    fn test_metadata_lists_type_names() {
        let metadata = SendGridProvider::new().metadata();
        assert!(metadata.resources.contains(&"sendgrid_api_key".to_string()));
        assert!(metadata
            .data_sources
            .contains(&"sendgrid_click_tracking_settings".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_types() {
        let provider = SendGridProvider::new();
        let err = provider
            .validate_resource_config("sendgrid_nope", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = provider
            .read_data_source("sendgrid_nope", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let provider = SendGridProvider::new();
        let err = provider
            .create("sendgrid_alert", json!({"type": "usage_limit"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_configure_with_block() {
        let provider = SendGridProvider::new();
        let diagnostics = provider
            .configure(json!({"api_key": "SG.test", "host": "http://127.0.0.1:9"}))
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
        let client = provider.client().await.unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:9/");
    }

    #[tokio::test]
    async fn test_configure_reports_invalid_block() {
        let provider = SendGridProvider::new();
        let diagnostics = provider
            .configure(json!({"api_key": "SG.test", "timeout_seconds": 0}))
            .await
            .unwrap();
        assert!(has_errors(&diagnostics));
        assert!(provider.client().await.is_err());
    }

    #[tokio::test]
    async fn test_validate_resource_config_runs_resource_checks() {
        let provider = SendGridProvider::new();
        let diagnostics = provider
            .validate_resource_config(
                "sendgrid_alert",
                json!({"type": "usage_limit", "email_to": "ops@example.com"}),
            )
            .await
            .unwrap();
        assert!(has_errors(&diagnostics));

        let diagnostics = provider
            .validate_resource_config(
                "sendgrid_alert",
                json!({"type": "usage_limit", "email_to": "ops@example.com", "percentage": 90}),
            )
            .await
            .unwrap();
        assert!(diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_plan_treats_null_prior_as_create() {
        let provider = SendGridProvider::new();
        let plan = provider
            .plan(
                "sendgrid_click_tracking_settings",
                Some(Value::Null),
                json!({"enabled": true}),
                json!({"enabled": true}),
            )
            .await
            .unwrap();
        assert!(plan.planned_state["id"].is_null());
        assert_eq!(plan.planned_state["enable_text"], false);
        assert!(!plan.requires_replace);
    }
}
