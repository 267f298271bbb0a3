//! In-memory AppRegistry for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::Application;
use crate::registry::{
    AppRegistry, AssociateResourceRequest, AssociateResourceResponse, AssociatedResource,
    DisassociateResourceRequest, Page, RegistryConnector,
};

/// The upstream operations a [`MockAppRegistry`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryOperation {
    /// ListApplications.
    ListApplications,
    /// AssociateResource.
    AssociateResource,
    /// ListAssociatedResources.
    ListAssociatedResources,
    /// DisassociateResource.
    DisassociateResource,
}

impl RegistryOperation {
    fn name(self) -> &'static str {
        match self {
            Self::ListApplications => "ListApplications",
            Self::AssociateResource => "AssociateResource",
            Self::ListAssociatedResources => "ListAssociatedResources",
            Self::DisassociateResource => "DisassociateResource",
        }
    }
}

/// A call received by a [`MockAppRegistry`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    /// One ListApplications page request.
    ListApplications {
        /// Continuation token sent.
        next_token: Option<String>,
    },
    /// An AssociateResource request.
    AssociateResource(AssociateResourceRequest),
    /// One ListAssociatedResources page request.
    ListAssociatedResources {
        /// Application queried.
        application: String,
        /// Continuation token sent.
        next_token: Option<String>,
    },
    /// A DisassociateResource request.
    DisassociateResource(DisassociateResourceRequest),
}

#[derive(Debug, Default)]
struct MockState {
    applications: Vec<Application>,
    associations: HashMap<String, Vec<AssociatedResource>>,
    resource_arns: HashMap<String, String>,
    failures: HashMap<RegistryOperation, String>,
    page_size: Option<usize>,
    omit_resource_arn: bool,
    calls: Vec<RegistryCall>,
}

impl MockState {
    fn knows_application(&self, application: &str) -> bool {
        self.applications
            .iter()
            .any(|a| a.arn == application || a.id == application || a.name == application)
    }
}

/// An [`AppRegistry`] that keeps applications and associations in memory.
///
/// Clones share state, so a test can hand one clone to the provider and
/// inspect [`MockAppRegistry::calls`] on another. Listings are split into
/// pages of [`MockAppRegistry::with_page_size`] items; tokens are offsets.
///
/// An application exists once it is seeded or has had a resource associated
/// with it. Listing the resources of any other application fails with
/// `ResourceNotFoundException`, as AppRegistry does.
#[derive(Debug, Clone, Default)]
pub struct MockAppRegistry {
    state: Arc<Mutex<MockState>>,
}

impl MockAppRegistry {
    /// An empty registry that returns every listing in one page.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an application.
    pub fn with_application(self, application: Application) -> Self {
        self.state().applications.push(application);
        self
    }

    /// Seed a resource already associated with `application`.
    pub fn with_associated(
        self,
        application: impl Into<String>,
        resource: AssociatedResource,
    ) -> Self {
        self.state()
            .associations
            .entry(application.into())
            .or_default()
            .push(resource);
        self
    }

    /// ARN to assign when `resource_name` is associated. Other names get a
    /// deterministic CloudFormation stack ARN.
    pub fn with_resource_arn(
        self,
        resource_name: impl Into<String>,
        arn: impl Into<String>,
    ) -> Self {
        self.state()
            .resource_arns
            .insert(resource_name.into(), arn.into());
        self
    }

    /// Split listings into pages of at most `page_size` items.
    pub fn with_page_size(self, page_size: usize) -> Self {
        self.state().page_size = Some(page_size.max(1));
        self
    }

    /// Fail every call of `operation` with `message`.
    pub fn fail_on(self, operation: RegistryOperation, message: impl Into<String>) -> Self {
        self.state().failures.insert(operation, message.into());
        self
    }

    /// Reply to AssociateResource without a resource ARN.
    pub fn omitting_resource_arn(self) -> Self {
        self.state().omit_resource_arn = true;
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state().calls.clone()
    }

    /// Resources currently associated with `application`.
    pub fn associated(&self, application: &str) -> Vec<AssociatedResource> {
        self.state()
            .associations
            .get(application)
            .cloned()
            .unwrap_or_default()
    }

    fn record(
        &self,
        call: RegistryCall,
        operation: RegistryOperation,
    ) -> Result<(), ProviderError> {
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.get(&operation) {
            Some(message) => Err(ProviderError::remote(
                format!("{} failed", operation.name()),
                message,
            )),
            None => Ok(()),
        }
    }
}

fn page<T: Clone>(
    items: &[T],
    next_token: Option<&str>,
    page_size: Option<usize>,
) -> Result<Page<T>, ProviderError> {
    let start = match next_token {
        None => 0,
        Some(token) => token.parse::<usize>().map_err(|_| {
            ProviderError::remote("Listing failed", format!("invalid next token {:?}", token))
        })?,
    };
    let start = start.min(items.len());
    let end = match page_size {
        Some(size) => (start + size).min(items.len()),
        None => items.len(),
    };

    let slice = items[start..end].to_vec();
    if end < items.len() {
        Ok(Page::with_next(slice, end.to_string()))
    } else {
        Ok(Page::last(slice))
    }
}

#[async_trait]
impl AppRegistry for MockAppRegistry {
    async fn list_applications(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<Application>, ProviderError> {
        self.record(
            RegistryCall::ListApplications {
                next_token: next_token.clone(),
            },
            RegistryOperation::ListApplications,
        )?;
        let state = self.state();
        page(&state.applications, next_token.as_deref(), state.page_size)
    }

    async fn associate_resource(
        &self,
        request: AssociateResourceRequest,
    ) -> Result<AssociateResourceResponse, ProviderError> {
        self.record(
            RegistryCall::AssociateResource(request.clone()),
            RegistryOperation::AssociateResource,
        )?;

        let mut state = self.state();
        let arn = state
            .resource_arns
            .get(&request.resource_name)
            .cloned()
            .unwrap_or_else(|| {
                format!(
                    "arn:aws:cloudformation:eu-west-2:123456789012:stack/{}",
                    request.resource_name
                )
            });

        let associated = state.associations.entry(request.application).or_default();
        if !associated.iter().any(|r| r.arn == arn) {
            associated.push(AssociatedResource {
                arn: arn.clone(),
                name: request.resource_name,
                resource_type: request.resource_type,
            });
        }

        Ok(AssociateResourceResponse {
            resource_arn: if state.omit_resource_arn { None } else { Some(arn) },
        })
    }

    async fn list_associated_resources(
        &self,
        application: &str,
        next_token: Option<String>,
    ) -> Result<Page<AssociatedResource>, ProviderError> {
        self.record(
            RegistryCall::ListAssociatedResources {
                application: application.to_string(),
                next_token: next_token.clone(),
            },
            RegistryOperation::ListAssociatedResources,
        )?;
        let state = self.state();
        match state.associations.get(application) {
            Some(resources) => page(resources, next_token.as_deref(), state.page_size),
            None if state.knows_application(application) => Ok(Page::last(Vec::new())),
            None => Err(ProviderError::remote(
                "ListAssociatedResources failed",
                format!(
                    "ResourceNotFoundException: Application {} does not exist",
                    application
                ),
            )),
        }
    }

    async fn disassociate_resource(
        &self,
        request: DisassociateResourceRequest,
    ) -> Result<(), ProviderError> {
        self.record(
            RegistryCall::DisassociateResource(request.clone()),
            RegistryOperation::DisassociateResource,
        )?;
        if let Some(associated) = self.state().associations.get_mut(&request.application) {
            associated.retain(|r| {
                !(r.name == request.resource_name && r.resource_type == request.resource_type)
            });
        }
        Ok(())
    }
}

/// A [`RegistryConnector`] that hands out a [`MockAppRegistry`], or fails.
#[derive(Debug, Clone)]
pub struct MockConnector {
    registry: MockAppRegistry,
    failure: Option<String>,
}

impl MockConnector {
    /// Connect to `registry`.
    pub fn new(registry: MockAppRegistry) -> Self {
        Self {
            registry,
            failure: None,
        }
    }

    /// Fail every connection attempt with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            registry: MockAppRegistry::new(),
            failure: Some(message.into()),
        }
    }
}

#[async_trait]
impl RegistryConnector for MockConnector {
    type Registry = MockAppRegistry;

    async fn connect(&self, _config: &ProviderConfig) -> Result<Self::Registry, ProviderError> {
        match &self.failure {
            Some(message) => Err(ProviderError::Configuration(message.clone())),
            None => Ok(self.registry.clone()),
        }
    }
}
