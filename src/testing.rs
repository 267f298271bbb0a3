//! Testing utilities for provider implementations.
//!
//! [`ProviderTester`] drives a [`ProviderService`] the way the host would,
//! without a host. [`MockAppRegistry`] and [`MockConnector`] replace AWS so
//! the whole provider can be exercised in-process.
//!
//! # Example
//!
//! ```ignore
//! use appregistry_provider::testing::{MockAppRegistry, MockConnector, ProviderTester};
//! use appregistry_provider::AppRegistryProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_associate() {
//!     let registry = MockAppRegistry::new();
//!     let tester = ProviderTester::new(AppRegistryProvider::with_connector(
//!         MockConnector::new(registry.clone()),
//!     ));
//!     tester.configure(json!({"region": "eu-west-2"})).await.unwrap();
//!
//!     let state = tester.create("servicecatalog_resource_association", json!({
//!         "application_arn": "arn:app",
//!         "resource_type": "CFN_STACK",
//!         "resource_name": "my-stack"
//!     })).await.unwrap();
//!
//!     assert!(state["id"].is_string());
//! }
//! ```

mod mock;

pub use mock::{MockAppRegistry, MockConnector, RegistryCall, RegistryOperation};

use crate::error::ProviderError;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::PlanResult;
use serde_json::Value;

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Get the list of data source type names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.metadata().data_sources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan against existing state.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource. `None` means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
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
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Validate a data source configuration.
    pub async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Read data from a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the state after read, `None` if the resource vanished.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;

        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;

        self.read(resource_type, created_state).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;

        self.delete(resource_type, current_state).await
    }

    /// Replace a resource the way the host does for immutable resources:
    /// delete the current instance, then run [`Self::lifecycle_create`]
    /// with the new configuration.
    pub async fn lifecycle_replace(
        &self,
        resource_type: &str,
        current_state: Value,
        new_config: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.lifecycle_delete(resource_type, current_state).await?;
        self.lifecycle_create(resource_type, new_config).await
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    let has_change = plan.changes.iter().any(|c| c.path == path);
    assert!(
        has_change,
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    assert!(
        crate::schema::has_errors(diagnostics),
        "Expected at least one error, but got none"
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.is_error() && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AppRegistryProvider, RESOURCE_ASSOCIATION_TYPE};
    use crate::registry::AssociatedResource;
    use serde_json::json;

    const APP_ARN: &str = "arn:aws:servicecatalog:eu-west-2:123456789012:/applications/app1";

    fn tester(registry: &MockAppRegistry) -> ProviderTester<AppRegistryProvider<MockConnector>> {
        ProviderTester::new(AppRegistryProvider::with_connector(MockConnector::new(
            registry.clone(),
        )))
    }

    fn config(resource_name: &str) -> Value {
        json!({
            "application_arn": APP_ARN,
            "resource_type": "CFN_STACK",
            "resource_name": resource_name
        })
    }

    #[tokio::test]
    async fn test_tester_configure() {
        let tester = tester(&MockAppRegistry::new());
        assert!(tester.configure(json!({"region": "eu-west-2"})).await.is_ok());
        assert!(tester.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_tester_configure_reports_diagnostics() {
        let tester = tester(&MockAppRegistry::new());
        match tester.configure(json!({"region": 7})).await {
            Err(TestError::Diagnostics(diags)) => {
                assert_eq!(diags[0].attribute.as_deref(), Some("region"));
            },
            other => panic!("unexpected result {:?}", other),
        }
        assert!(tester
            .validate_provider_config(json!({"region": "eu-west-2"}))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_tester_plan_update_changes_attribute() {
        let tester = tester(&MockAppRegistry::new());
        let prior = json!({
            "application_arn": APP_ARN,
            "resource_type": "CFN_STACK",
            "resource_name": "old",
            "resource_arn": "arn:old",
            "options": null,
            "id": "x"
        });

        let plan = tester
            .plan_update(RESOURCE_ASSOCIATION_TYPE, prior, config("new"))
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "resource_name");
        assert!(!plan.requires_replace);
    }

    #[tokio::test]
    async fn test_tester_lifecycle_replace() {
        let registry = MockAppRegistry::new();
        let tester = tester(&registry);
        tester.configure(json!({"region": "eu-west-2"})).await.unwrap();

        let old = tester
            .lifecycle_create(RESOURCE_ASSOCIATION_TYPE, config("old"))
            .await
            .unwrap()
            .unwrap();
        let new = tester
            .lifecycle_replace(RESOURCE_ASSOCIATION_TYPE, old, config("new"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(new["resource_name"], "new");
        let names: Vec<String> = registry
            .associated(APP_ARN)
            .into_iter()
            .map(|r: AssociatedResource| r.name)
            .collect();
        assert_eq!(names, vec!["new"]);
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Unable to create AWS Config")];
        assert_has_errors(&diagnostics);
        assert_error_contains(&diagnostics, "AWS Config");
    }

    #[test]
    #[should_panic(expected = "Expected plan to have changes")]
    fn test_assert_plan_creates_fails_without_changes() {
        assert_plan_creates(&PlanResult::no_change(json!({})));
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Missing required attribute 'region'").with_attribute("region"),
            Diagnostic::error("Unable to create AWS Config").with_detail("no credentials"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("Missing required attribute"));
        assert!(display.contains("(at region)"));
        assert!(display.contains("no credentials"));
    }
}
