//! The AppRegistry provider.
//!
//! [`AppRegistryProvider`] implements [`ProviderService`]: it validates and
//! applies the provider configuration, builds the registry client through its
//! [`RegistryConnector`], and dispatches every resource and data source
//! callback to the component that owns the type.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::applications::{self, ApplicationsDataSource};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::ResourceAssociation;
use crate::reconciler::{self, ReadOutcome, ResourceAssociationReconciler};
use crate::registry::{AwsConnector, RegistryConnector};
use crate::schema::{has_errors, Diagnostic, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Type name of the provider.
pub const PROVIDER_TYPE_NAME: &str = "servicecatalog";

/// Type name of the resource association resource.
pub const RESOURCE_ASSOCIATION_TYPE: &str = "servicecatalog_resource_association";

/// Type name of the applications data source.
pub const APPLICATIONS_TYPE: &str = "servicecatalog_applications";

/// Components built by `configure`, all sharing one registry client.
struct Configured<R> {
    config: ProviderConfig,
    associations: ResourceAssociationReconciler<R>,
    applications: ApplicationsDataSource<R>,
}

/// Provider for AWS Service Catalog AppRegistry.
///
/// The connector decides which registry client `configure` builds; the
/// default connects to AWS.
pub struct AppRegistryProvider<C: RegistryConnector = AwsConnector> {
    connector: C,
    configured: RwLock<Option<Arc<Configured<C::Registry>>>>,
}

impl AppRegistryProvider<AwsConnector> {
    /// Create a provider that talks to AWS once configured.
    pub fn new() -> Self {
        Self::with_connector(AwsConnector)
    }
}

impl Default for AppRegistryProvider<AwsConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RegistryConnector> AppRegistryProvider<C> {
    /// Create a provider that builds its registry client with `connector`.
    pub fn with_connector(connector: C) -> Self {
        Self {
            connector,
            configured: RwLock::new(None),
        }
    }

    /// Whether `configure` has completed successfully.
    pub async fn is_configured(&self) -> bool {
        self.configured.read().await.is_some()
    }

    /// The region the provider was configured with.
    pub async fn region(&self) -> Option<String> {
        self.configured
            .read()
            .await
            .as_ref()
            .map(|c| c.config.region.clone())
    }

    async fn configured(&self) -> Result<Arc<Configured<C::Registry>>, ProviderError> {
        self.configured.read().await.clone().ok_or_else(|| {
            ProviderError::Configuration(
                "provider has not been configured; call configure first".to_string(),
            )
        })
    }
}

fn unknown_resource(resource_type: &str) -> ProviderError {
    ProviderError::UnknownResource(resource_type.to_string())
}

#[async_trait::async_trait]
impl<C: RegistryConnector> ProviderService for AppRegistryProvider<C> {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(ProviderConfig::schema())
            .with_resource(RESOURCE_ASSOCIATION_TYPE, reconciler::schema())
            .with_data_source(APPLICATIONS_TYPE, applications::schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            resources: vec![RESOURCE_ASSOCIATION_TYPE.to_string()],
            data_sources: vec![APPLICATIONS_TYPE.to_string()],
        }
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(ProviderConfig::validate(&config))
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = ProviderConfig::validate(&config);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "Configure rejected invalid configuration");
            return Ok(diagnostics);
        }

        let config: ProviderConfig = serde_json::from_value(config)?;
        let registry = match self.connector.connect(&config).await {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                error!(region = %config.region, error = %e, "Unable to create AWS Config");
                return Ok(vec![
                    Diagnostic::error("Unable to create AWS Config").with_detail(e.to_string())
                ]);
            },
        };

        let configured = Configured {
            associations: ResourceAssociationReconciler::new(Arc::clone(&registry)),
            applications: ApplicationsDataSource::new(registry),
            config,
        };
        info!(region = %configured.config.region, "Provider configured");
        *self.configured.write().await = Some(Arc::new(configured));

        Ok(diagnostics)
    }

    async fn stop(&self) -> Result<(), ProviderError> {
        debug!("Provider stopped");
        Ok(())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        match resource_type {
            RESOURCE_ASSOCIATION_TYPE => Ok(validate(&reconciler::schema(), &config)),
            other => Err(unknown_resource(other)),
        }
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        match resource_type {
            RESOURCE_ASSOCIATION_TYPE => {
                let plan = reconciler::plan(prior_state.as_ref(), proposed_state)?;
                debug!(changes = plan.changes.len(), "Plan completed");
                Ok(plan)
            },
            other => Err(unknown_resource(other)),
        }
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            RESOURCE_ASSOCIATION_TYPE => {
                let planned = ResourceAssociation::from_value(&planned_state)?;
                let configured = self.configured().await?;
                let created = configured.associations.create(planned).await.map_err(|e| {
                    error!(error = %e, "Create failed");
                    e
                })?;
                created.to_value()
            },
            other => Err(unknown_resource(other)),
        }
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        match resource_type {
            RESOURCE_ASSOCIATION_TYPE => {
                let state = ResourceAssociation::from_value(&current_state)?;
                let configured = self.configured().await?;
                match configured.associations.read(state).await? {
                    ReadOutcome::Present(state) => Ok(Some(state.to_value()?)),
                    ReadOutcome::Absent => Ok(None),
                }
            },
            other => Err(unknown_resource(other)),
        }
    }

    #[instrument(skip(self, prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        match resource_type {
            RESOURCE_ASSOCIATION_TYPE => {
                let updated =
                    reconciler::reject_update(&prior_state, &planned_state).map_err(|e| {
                        warn!(error = %e, "Update rejected");
                        e
                    })?;
                updated.to_value()
            },
            other => Err(unknown_resource(other)),
        }
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        match resource_type {
            RESOURCE_ASSOCIATION_TYPE => {
                let state = ResourceAssociation::from_value(&current_state)?;
                let configured = self.configured().await?;
                configured.associations.delete(&state).await.map_err(|e| {
                    error!(error = %e, "Delete failed");
                    e
                })
            },
            other => Err(unknown_resource(other)),
        }
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        match data_source_type {
            APPLICATIONS_TYPE => Ok(validate(&applications::schema(), &config)),
            other => Err(unknown_resource(other)),
        }
    }

    #[instrument(skip(self, _config), name = "provider.read_data_source")]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: Value,
    ) -> Result<Value, ProviderError> {
        match data_source_type {
            APPLICATIONS_TYPE => {
                let configured = self.configured().await?;
                let state = configured.applications.read().await.map_err(|e| {
                    error!(error = %e, "Listing applications failed");
                    e
                })?;
                Ok(serde_json::to_value(state)?)
            },
            other => Err(unknown_resource(other)),
        }
    }
}
