//! The AppRegistry service boundary.
//!
//! [`AppRegistry`] mirrors the four upstream operations one page at a time and
//! stays as close as possible to the SDK client, so the code that cannot be
//! exercised without AWS is kept small. Components above it call
//! [`collect_pages`] to drain continuation tokens.
//!
//! [`RegistryConnector`] builds a registry from [`ProviderConfig`]; its
//! associated type fixes the client type the provider hands out.

pub mod aws;

use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::Application;

pub use aws::{AwsAppRegistry, AwsConnector};

/// One page of an upstream listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    /// A page followed by more.
    pub fn with_next(items: Vec<T>, next_token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: Some(next_token.into()),
        }
    }
}

/// A resource associated with an application, as listed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociatedResource {
    /// ARN of the resource.
    pub arn: String,
    /// Name of the resource.
    pub name: String,
    /// Resource type, e.g. `CFN_STACK`.
    pub resource_type: String,
}

/// Input of AssociateResource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociateResourceRequest {
    /// Application name, id, or ARN.
    pub application: String,
    /// Name or ARN of the resource.
    pub resource_name: String,
    /// Resource type.
    pub resource_type: String,
    /// Association options, sent as given.
    pub options: Vec<String>,
}

/// Output of AssociateResource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssociateResourceResponse {
    /// ARN the service assigned to the associated resource.
    pub resource_arn: Option<String>,
}

/// Input of DisassociateResource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisassociateResourceRequest {
    /// Application name, id, or ARN.
    pub application: String,
    /// Name or ARN of the resource.
    pub resource_name: String,
    /// Resource type.
    pub resource_type: String,
}

/// The AppRegistry operations the provider consumes.
#[async_trait]
pub trait AppRegistry: Send + Sync + 'static {
    /// Fetch one page of applications.
    async fn list_applications(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<Application>, ProviderError>;

    /// Associate a resource with an application.
    async fn associate_resource(
        &self,
        request: AssociateResourceRequest,
    ) -> Result<AssociateResourceResponse, ProviderError>;

    /// Fetch one page of the resources associated with `application`.
    async fn list_associated_resources(
        &self,
        application: &str,
        next_token: Option<String>,
    ) -> Result<Page<AssociatedResource>, ProviderError>;

    /// Remove a resource from an application.
    async fn disassociate_resource(
        &self,
        request: DisassociateResourceRequest,
    ) -> Result<(), ProviderError>;
}

/// Builds an [`AppRegistry`] from provider configuration.
#[async_trait]
pub trait RegistryConnector: Send + Sync + 'static {
    /// The registry this connector produces.
    type Registry: AppRegistry;

    /// Build a registry client for `config`.
    async fn connect(&self, config: &ProviderConfig) -> Result<Self::Registry, ProviderError>;
}

/// Drain a paginated listing, calling `fetch` with each continuation token
/// until a page arrives without one.
///
/// An empty token counts as the end of the listing.
pub async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ProviderError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ProviderError>>,
{
    let mut items = Vec::new();
    let mut next_token = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(next_token.take()).await?;
        pages += 1;
        items.extend(page.items);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    debug!(pages, items = items.len(), "Listing drained");
    Ok(items)
}
