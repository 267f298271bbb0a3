//! The `applications` data source: every AppRegistry application visible to
//! the configured account and region.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::ProviderError;
use crate::model::{Application, ApplicationsState};
use crate::registry::{collect_pages, AppRegistry};
use crate::schema::{Attribute, AttributeType, Schema};

/// Schema of the applications data source. It takes no inputs.
pub fn schema() -> Schema {
    let application = AttributeType::object([
        ("id", AttributeType::String),
        ("arn", AttributeType::String),
        ("name", AttributeType::String),
        ("description", AttributeType::String),
    ]);

    Schema::v0()
        .with_description("Lists Appregistry applications")
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Identifier of the listing"),
        )
        .with_attribute(
            "applications",
            Attribute::computed_list(application)
                .with_description("Appregistry applications in the configured region"),
        )
}

/// Reads the application listing.
pub struct ApplicationsDataSource<R> {
    registry: Arc<R>,
}

impl<R: AppRegistry> ApplicationsDataSource<R> {
    /// Create a data source that lists through `registry`.
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Every application, across all pages, in upstream order.
    pub async fn list(&self) -> Result<Vec<Application>, ProviderError> {
        let registry = &self.registry;
        collect_pages(move |token| registry.list_applications(token))
            .await
            .map_err(|e| match e {
                ProviderError::RemoteCall { message, .. } => ProviderError::RemoteCall {
                    summary: "Unable to list appregistry Applications".to_string(),
                    message,
                },
                other => other,
            })
    }

    /// Produce the data source state.
    #[instrument(skip(self))]
    pub async fn read(&self) -> Result<ApplicationsState, ProviderError> {
        let applications = self.list().await?;
        info!(count = applications.len(), "Listed applications");
        Ok(ApplicationsState::new(applications))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::APPLICATIONS_BATCH_ID;
    use crate::testing::{MockAppRegistry, RegistryOperation};
    use tokio_test::{assert_err, assert_ok};

    fn application(n: usize) -> Application {
        Application {
            id: format!("app{}", n),
            arn: format!("arn:aws:servicecatalog:eu-west-2:123456789012:/applications/app{}", n),
            name: format!("application-{}", n),
            description: if n % 2 == 0 {
                String::new()
            } else {
                format!("app number {}", n)
            },
        }
    }

    fn data_source(registry: &MockAppRegistry) -> ApplicationsDataSource<MockAppRegistry> {
        ApplicationsDataSource::new(Arc::new(registry.clone()))
    }

    #[tokio::test]
    async fn test_read_single_page() {
        let registry = MockAppRegistry::new()
            .with_application(application(1))
            .with_application(application(2));

        let state = assert_ok!(data_source(&registry).read().await);
        assert_eq!(state.id, APPLICATIONS_BATCH_ID);
        assert_eq!(state.applications, vec![application(1), application(2)]);
        assert_eq!(state.applications[1].description, "");
    }

    #[tokio::test]
    async fn test_read_empty() {
        let registry = MockAppRegistry::new();
        let state = assert_ok!(data_source(&registry).read().await);
        assert!(state.applications.is_empty());
        assert!(!state.id.is_empty());
    }

    #[tokio::test]
    async fn test_read_follows_pagination_in_order() {
        let mut registry = MockAppRegistry::new().with_page_size(3);
        for n in 0..7 {
            registry = registry.with_application(application(n));
        }

        let state = assert_ok!(data_source(&registry).read().await);
        let expected: Vec<Application> = (0..7).map(application).collect();
        assert_eq!(state.applications, expected);
        assert_eq!(registry.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_read_failure_has_listing_summary() {
        let registry =
            MockAppRegistry::new().fail_on(RegistryOperation::ListApplications, "ExpiredToken");
        let err = assert_err!(data_source(&registry).read().await);

        match err {
            ProviderError::RemoteCall { summary, message } => {
                assert_eq!(summary, "Unable to list appregistry Applications");
                assert_eq!(message, "ExpiredToken");
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_schema_is_computed_only() {
        let schema = schema();
        assert!(schema.attribute("id").unwrap().flags.is_computed_only());
        let applications = schema.attribute("applications").unwrap();
        assert!(applications.flags.is_computed_only());
        match &applications.attr_type {
            AttributeType::List(element) => match element.as_ref() {
                AttributeType::Object(fields) => {
                    for field in ["id", "arn", "name", "description"] {
                        assert!(fields.contains_key(field), "missing {}", field);
                    }
                },
                other => panic!("unexpected element type {:?}", other),
            },
            other => panic!("unexpected type {:?}", other),
        }
    }
}
