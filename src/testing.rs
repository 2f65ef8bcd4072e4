//! Test harness for driving a provider without a gRPC server.
//!
//! [`ProviderTester`] runs the same sequence the host would: validate the
//! configuration, plan, apply, refresh and import. Acceptance tests point a
//! configured provider at a mock SendGrid API and assert on the resulting
//! states.
//!
//! ```ignore
//! use terraform_provider_sendgrid::testing::ProviderTester;
//! use terraform_provider_sendgrid::SendGridProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn bounce_settings_round_trip() {
//!     let tester = ProviderTester::new(SendGridProvider::new());
//!     tester.configure(json!({"api_key": "SG.test", "host": server.uri()})).await.unwrap();
//!
//!     let state = tester
//!         .apply_create("sendgrid_bounce_settings", json!({"soft_bounces": 30}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["soft_bounces"], 30);
//! }
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::error::ProviderError;
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::PlanResult;

/// Failure of a tester operation.
#[derive(Debug, Error)]
pub enum TestError {
    /// Validation returned error diagnostics.
    #[error("{}", format_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    /// The provider returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider behaved in a way the host would reject.
    #[error("Unexpected provider behavior: {0}")]
    Unexpected(String),
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("Operation failed with {} diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str(&format!("\n  [{:?}] {}", diag.severity, diag.summary));
        if let Some(detail) = &diag.detail {
            out.push_str(&format!(": {}", detail));
        }
        if let Some(attr) = &diag.attribute {
            out.push_str(&format!(" (at {})", attr));
        }
    }
    out
}

/// Keep warnings, fail on errors.
fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<Vec<Diagnostic>, TestError> {
    if has_errors(&diagnostics) {
        Err(TestError::Diagnostics(
            diagnostics.into_iter().filter(Diagnostic::is_error).collect(),
        ))
    } else {
        Ok(diagnostics)
    }
}

/// States observed over a full resource lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleStates {
    /// State after create and refresh.
    pub created: Value,
    /// State after update and refresh.
    pub updated: Value,
    /// State returned by importing the updated object by id.
    pub imported: Value,
}

/// Drives a [`ProviderService`] the way the host does.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap a provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// The provider schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider block. Warnings are returned on success.
    pub async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider. Warnings are returned on success.
    pub async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(self.provider.configure(config).await?)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Single Operations
    // =========================================================================

    /// Validate a resource configuration. Warnings are returned on success.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, TestError> {
        check_diagnostics(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan creating a resource from `config`.
    pub async fn plan_create(&self, resource_type: &str, config: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan moving `prior_state` to `config`.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan destroying a resource.
    pub async fn plan_delete(&self, resource_type: &str, prior_state: Value) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a resource from a planned state.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a state. `None` means the object is gone.
    pub async fn refresh(&self, resource_type: &str, state: Value) -> Result<Option<Value>, ProviderError> {
        let refreshed = self.provider.read(resource_type, state).await?;
        Ok((!refreshed.is_null()).then_some(refreshed))
    }

    /// Update a resource in place.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// Import a resource by id. The provider must return exactly one state
    /// of the requested type.
    pub async fn import(&self, resource_type: &str, id: &str) -> Result<Value, TestError> {
        let mut imported = self.provider.import_resource(resource_type, id).await?;
        match imported.len() {
            1 => {
                let resource = imported.remove(0);
                if resource.resource_type != resource_type {
                    return Err(TestError::Unexpected(format!(
                        "import of {} returned a {}",
                        resource_type, resource.resource_type
                    )));
                }
                Ok(resource.state)
            }
            n => Err(TestError::Unexpected(format!(
                "import of {} {:?} returned {} states",
                resource_type, id, n
            ))),
        }
    }

    /// Validate and read a data source.
    pub async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, TestError> {
        check_diagnostics(
            self.provider
                .validate_data_source_config(data_source_type, config.clone())
                .await?,
        )?;
        Ok(self
            .provider
            .read_data_source(data_source_type, config)
            .await?)
    }

    // =========================================================================
    // Apply Flows
    // =========================================================================

    /// validate, plan, create, refresh. Returns the refreshed state.
    pub async fn apply_create(&self, resource_type: &str, config: Value) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.refresh_existing(resource_type, created, "create").await
    }

    /// validate, plan, then update in place or replace. Returns the refreshed state.
    pub async fn apply_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, TestError> {
        self.validate_resource_config(resource_type, config.clone())
            .await?;
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;

        let applied = if plan.requires_replace {
            self.delete(resource_type, prior_state).await?;
            self.create(resource_type, plan.planned_state).await?
        } else if plan.has_changes() {
            self.update(resource_type, prior_state, plan.planned_state)
                .await?
        } else {
            prior_state
        };
        self.refresh_existing(resource_type, applied, "update").await
    }

    /// plan a destroy, then delete.
    pub async fn apply_delete(&self, resource_type: &str, state: Value) -> Result<(), TestError> {
        let plan = self.plan_delete(resource_type, state.clone()).await?;
        if !plan.is_destroy() {
            return Err(TestError::Unexpected(format!(
                "destroy plan for {} kept a state",
                resource_type
            )));
        }
        Ok(self.delete(resource_type, state).await?)
    }

    /// create, update, import by id, delete.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<LifecycleStates, TestError> {
        let created = self.apply_create(resource_type, initial_config).await?;
        let updated = self
            .apply_update(resource_type, created.clone(), updated_config)
            .await?;

        let id = updated
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| TestError::Unexpected(format!("{} state has no id", resource_type)))?
            .to_string();
        let imported = self.import(resource_type, &id).await?;

        self.apply_delete(resource_type, updated.clone()).await?;
        Ok(LifecycleStates {
            created,
            updated,
            imported,
        })
    }

    async fn refresh_existing(&self, resource_type: &str, state: Value, after: &str) -> Result<Value, TestError> {
        self.refresh(resource_type, state).await?.ok_or_else(|| {
            TestError::Unexpected(format!("{} disappeared after {}", resource_type, after))
        })
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

/// Assert that a plan creates without replacing.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(!plan.requires_replace, "Expected plan to create, not replace");
}

/// Assert that a plan changes nothing.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        changed_paths(plan)
    );
}

/// Assert that a plan requires replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not. Changed attributes: {:?}",
        changed_paths(plan)
    );
}

/// Assert that a plan updates in place.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        plan.has_changes() && !plan.requires_replace,
        "Expected an in-place update, got requires_replace={} with changes {:?}",
        plan.requires_replace,
        changed_paths(plan)
    );
}

/// Assert that a plan destroys the resource.
pub fn assert_plan_destroys(plan: &PlanResult) {
    assert!(
        plan.is_destroy(),
        "Expected a destroy plan, got planned state {}",
        plan.planned_state
    );
}

/// Assert that a plan changes `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        changed_paths(plan)
    );
}

/// Assert that a plan leaves `path` alone.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes.iter().any(|c| c.path == path),
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| &d.summary)
        .collect();
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors
    );
}

/// Assert that diagnostics contain an error whose summary or detail contains `substring`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let matches = diagnostics.iter().any(|d| {
        d.is_error()
            && (d.summary.contains(substring)
                || d.detail.as_deref().is_some_and(|detail| detail.contains(substring)))
    });
    assert!(
        matches,
        "Expected an error containing '{}'. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}
