//! The callback surface the host drives.
//!
//! Every payload crosses [`ProviderService`] as a `serde_json::Value`, and
//! every failure comes back as a [`ProviderError`] or as error
//! [`Diagnostic`]s. The transport that carries these calls belongs to the
//! host adapter; [`crate::AppRegistryProvider`] is the implementation it
//! drives.

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{PlanResult, ProviderMetadata};

/// Host callbacks for the AppRegistry provider.
///
/// Resource callbacks name the resource type they target; an unknown type is
/// a [`ProviderError::UnknownResource`]. Validation and `configure` report
/// user-facing problems as diagnostics and reserve `Err` for failures of the
/// provider itself.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schemas of the provider block, resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Provider type name and the resource and data source type names.
    fn metadata(&self) -> ProviderMetadata;

    /// Check the provider block without applying it.
    async fn validate_provider_config(&self, config: Value)
        -> Result<Vec<Diagnostic>, ProviderError>;

    /// Apply the provider block and build the registry client.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Called once when the host shuts the provider down.
    async fn stop(&self) -> Result<(), ProviderError>;

    /// Check a resource block.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Plan a create (`prior_state` is `None`), a change, or a removal
    /// (`proposed_state` is null).
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a resource from its planned state.
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Refresh a resource. `Ok(None)` means it no longer exists and the host
    /// should remove it from state.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Apply a planned change to an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Destroy a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Check a data source block.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Read a data source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError>;
}
