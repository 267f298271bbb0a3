//! State models for the applications data source and the resource association.
//!
//! These are the shapes the host stores. Field names match the attribute
//! names in the schemas, so a model round-trips through `serde_json` as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// The association option applied when none is configured.
pub const APPLY_APPLICATION_TAG: &str = "APPLY_APPLICATION_TAG";

/// Identifier of the applications data source state. One listing covers the
/// whole account and region, so the id is fixed.
pub const APPLICATIONS_BATCH_ID: &str = "appregistry-applications";

/// An AppRegistry application as exposed by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    /// Application id.
    pub id: String,
    /// Application ARN.
    pub arn: String,
    /// Application name.
    pub name: String,
    /// Application description; empty when the application has none.
    pub description: String,
}

/// State of the applications data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationsState {
    /// Synthetic identifier of the listing.
    pub id: String,
    /// Applications in upstream order.
    pub applications: Vec<Application>,
}

impl ApplicationsState {
    /// Wrap a listing with the batch identifier.
    pub fn new(applications: Vec<Application>) -> Self {
        Self {
            id: APPLICATIONS_BATCH_ID.to_string(),
            applications,
        }
    }
}

/// State of a resource association.
///
/// `resource_arn` and `id` are unknown until the association is created.
/// `options` keeps what was configured, which may be absent; see
/// [`ResourceAssociation::effective_options`] for what is sent upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAssociation {
    /// ARN (or name/id) of the AppRegistry application.
    pub application_arn: String,
    /// Type of the associated resource, e.g. `CFN_STACK`.
    pub resource_type: String,
    /// Name of the associated resource.
    pub resource_name: String,
    /// ARN of the associated resource, assigned by the service.
    #[serde(default)]
    pub resource_arn: Option<String>,
    /// Configured association options.
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// `application_arn:resource_arn` once created.
    #[serde(default)]
    pub id: Option<String>,
}

impl ResourceAssociation {
    /// Create an association that has not been applied yet.
    pub fn new(
        application_arn: impl Into<String>,
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
    ) -> Self {
        Self {
            application_arn: application_arn.into(),
            resource_type: resource_type.into(),
            resource_name: resource_name.into(),
            resource_arn: None,
            options: None,
            id: None,
        }
    }

    /// Set the configured options.
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    /// The options to send upstream: the configured list, or
    /// [`APPLY_APPLICATION_TAG`] alone when nothing (or an empty list) is configured.
    pub fn effective_options(&self) -> Vec<String> {
        match &self.options {
            Some(options) if !options.is_empty() => options.clone(),
            _ => vec![APPLY_APPLICATION_TAG.to_string()],
        }
    }

    /// Record the service-assigned resource ARN and derive the id from it.
    pub fn mark_created(mut self, resource_arn: impl Into<String>) -> Self {
        let resource_arn = resource_arn.into();
        self.id = Some(association_id(&self.application_arn, &resource_arn));
        self.resource_arn = Some(resource_arn);
        self
    }

    /// Decode from a host state or plan payload.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Encode as a host state payload.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Identifier of an association: `application_arn + ":" + resource_arn`.
pub fn association_id(application_arn: &str, resource_arn: &str) -> String {
    format!("{}:{}", application_arn, resource_arn)
}
