//! AppRegistry backed by the AWS SDK.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_servicecatalogappregistry::error::DisplayErrorContext;
use aws_sdk_servicecatalogappregistry::types::{
    ApplicationSummary, AssociationOption, ResourceInfo, ResourceType,
};
use aws_sdk_servicecatalogappregistry::Client;
use tracing::debug;

use super::{
    AppRegistry, AssociateResourceRequest, AssociateResourceResponse, AssociatedResource,
    DisassociateResourceRequest, Page, RegistryConnector,
};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::Application;

/// [`AppRegistry`] over `aws_sdk_servicecatalogappregistry::Client`.
#[derive(Debug, Clone)]
pub struct AwsAppRegistry {
    client: Client,
}

impl AwsAppRegistry {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Load the default AWS configuration chain for `region` and build a client.
    pub async fn from_region(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl AppRegistry for AwsAppRegistry {
    async fn list_applications(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<Application>, ProviderError> {
        let output = self
            .client
            .list_applications()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                ProviderError::remote("ListApplications failed", DisplayErrorContext(&e))
            })?;

        Ok(Page {
            items: output
                .applications
                .unwrap_or_default()
                .into_iter()
                .map(application_from_summary)
                .collect(),
            next_token: output.next_token,
        })
    }

    async fn associate_resource(
        &self,
        request: AssociateResourceRequest,
    ) -> Result<AssociateResourceResponse, ProviderError> {
        debug!(
            application = %request.application,
            resource = %request.resource_name,
            resource_type = %request.resource_type,
            options = ?request.options,
            "AssociateResource"
        );
        let options = request
            .options
            .iter()
            .map(|opt| AssociationOption::from(opt.as_str()))
            .collect();

        let output = self
            .client
            .associate_resource()
            .application(request.application)
            .resource(request.resource_name)
            .resource_type(ResourceType::from(request.resource_type.as_str()))
            .set_options(Some(options))
            .send()
            .await
            .map_err(|e| {
                ProviderError::remote("AssociateResource failed", DisplayErrorContext(&e))
            })?;

        Ok(AssociateResourceResponse {
            resource_arn: output.resource_arn,
        })
    }

    async fn list_associated_resources(
        &self,
        application: &str,
        next_token: Option<String>,
    ) -> Result<Page<AssociatedResource>, ProviderError> {
        let output = self
            .client
            .list_associated_resources()
            .application(application)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                ProviderError::remote("ListAssociatedResources failed", DisplayErrorContext(&e))
            })?;

        Ok(Page {
            items: output
                .resources
                .unwrap_or_default()
                .into_iter()
                .map(associated_from_info)
                .collect(),
            next_token: output.next_token,
        })
    }

    async fn disassociate_resource(
        &self,
        request: DisassociateResourceRequest,
    ) -> Result<(), ProviderError> {
        debug!(
            application = %request.application,
            resource = %request.resource_name,
            resource_type = %request.resource_type,
            "DisassociateResource"
        );
        self.client
            .disassociate_resource()
            .application(request.application)
            .resource(request.resource_name)
            .resource_type(ResourceType::from(request.resource_type.as_str()))
            .send()
            .await
            .map_err(|e| {
                ProviderError::remote("DisassociateResource failed", DisplayErrorContext(&e))
            })?;

        Ok(())
    }
}

fn application_from_summary(summary: ApplicationSummary) -> Application {
    Application {
        id: summary.id.unwrap_or_default(),
        arn: summary.arn.unwrap_or_default(),
        name: summary.name.unwrap_or_default(),
        description: summary.description.unwrap_or_default(),
    }
}

fn associated_from_info(info: ResourceInfo) -> AssociatedResource {
    AssociatedResource {
        arn: info.arn.unwrap_or_default(),
        name: info.name.unwrap_or_default(),
        resource_type: info
            .resource_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_default(),
    }
}

/// Connects to AppRegistry in the configured region using the default AWS
/// credential chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsConnector;

#[async_trait]
impl RegistryConnector for AwsConnector {
    type Registry = AwsAppRegistry;

    async fn connect(&self, config: &ProviderConfig) -> Result<Self::Registry, ProviderError> {
        Ok(AwsAppRegistry::from_region(&config.region).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_from_summary() {
        let id = "08eyt0oo157qjgw5x6ieigqsgw";
        let arn = format!("arn:aws:servicecatalog:eu-west-2:390746273208:/applications/{}", id);
        let summary = ApplicationSummary::builder()
            .id(id)
            .arn(&arn)
            .name("instance-scheduler")
            .build();

        let app = application_from_summary(summary);
        assert_eq!(app.id, id);
        assert_eq!(app.arn, arn);
        assert_eq!(app.name, "instance-scheduler");
        assert_eq!(app.description, "");
    }

    #[test]
    fn test_associated_from_info() {
        let info = ResourceInfo::builder()
            .name("my-stack")
            .arn("arn:aws:cloudformation:eu-west-2:123456789012:stack/my-stack/1")
            .resource_type(ResourceType::CfnStack)
            .build();

        let resource = associated_from_info(info);
        assert_eq!(resource.name, "my-stack");
        assert_eq!(resource.resource_type, "CFN_STACK");
        assert!(resource.arn.ends_with("stack/my-stack/1"));
    }
}
