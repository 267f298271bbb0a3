//! AWS Service Catalog AppRegistry provider
//!
//! This crate implements an infrastructure-as-code provider for
//! [AWS Service Catalog AppRegistry][appregistry].
//! It sits behind the host's plugin transport and answers its callbacks
//! through the [`ProviderService`] trait.
//!
//! [appregistry]: https://docs.aws.amazon.com/servicecatalog/latest/arguide/intro-app-registry.html
//!
//! # Overview
//!
//! The provider offers:
//!
//! - **`servicecatalog_applications`**: a data source listing every
//!   AppRegistry application in the configured region
//! - **`servicecatalog_resource_association`**: a resource associating one
//!   cloud resource (for example a CloudFormation stack) with an application
//!
//! Associations are immutable. Reads re-list the application's resources and
//! report an association that disappeared upstream as absent, so the host
//! drops it from state; updates are always rejected.
//!
//! # Quick Start
//!
//! ```ignore
//! use appregistry_provider::{init_logging, AppRegistryProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = AppRegistryProvider::new();
//!     provider.configure(json!({"region": "eu-west-2"})).await?;
//!
//!     let application_arn = "arn:aws:servicecatalog:eu-west-2:123456789012:/applications/abc";
//!     let state = provider
//!         .create(
//!             "servicecatalog_resource_association",
//!             json!({
//!                 "application_arn": application_arn,
//!                 "resource_type": "CFN_STACK",
//!                 "resource_name": "my-stack"
//!             }),
//!         )
//!         .await?;
//!     println!("{}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Layout
//!
//! - [`registry`]: the AppRegistry operations as a trait, with the AWS SDK
//!   implementation and pagination
//! - [`reconciler`]: the resource association lifecycle
//! - [`applications`]: the applications listing
//! - [`provider`]: configuration and dispatch by type
//! - [`testing`]: a tester and an in-memory registry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod applications;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod provider;
pub mod reconciler;
pub mod registry;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use applications::ApplicationsDataSource;
pub use config::ProviderConfig;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use model::{Application, ApplicationsState, ResourceAssociation};
pub use provider::{
    AppRegistryProvider, APPLICATIONS_TYPE, PROVIDER_TYPE_NAME, RESOURCE_ASSOCIATION_TYPE,
};
pub use reconciler::{ReadOutcome, ResourceAssociationReconciler};
pub use registry::{AppRegistry, AwsAppRegistry, AwsConnector, RegistryConnector};
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, PlanResult, ProviderMetadata};
pub use validation::validate;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
