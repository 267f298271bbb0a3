//! Lifecycle of the resource association.
//!
//! The reconciler turns create/read/delete intents into AppRegistry calls and
//! maps the results back into [`ResourceAssociation`] state. Planning and
//! update rejection never touch the registry, so they are free functions.
//!
//! AppRegistry has no point lookup for an association, so read re-lists the
//! application's associated resources and scans for the stored ARN. An
//! association that disappeared upstream is drift, not a fault: read reports
//! [`ReadOutcome::Absent`] and the host forgets the instance. If the
//! application itself is gone, AppRegistry rejects the listing and read fails
//! with a [`ProviderError::RemoteCall`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;
use crate::model::ResourceAssociation;
use crate::registry::{
    collect_pages, AppRegistry, AssociateResourceRequest, DisassociateResourceRequest,
};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::types::{diff_attributes, PlanResult};

/// Result of re-verifying an association against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The association still exists; state is returned unchanged.
    Present(ResourceAssociation),
    /// The association is gone; local state must be dropped.
    Absent,
}

/// Schema of the resource association.
pub fn schema() -> Schema {
    Schema::v0()
        .with_description("Associates a resource with an AppRegistry application")
        .with_attribute(
            "application_arn",
            Attribute::required_string().with_description("ARN of the Appregistry application"),
        )
        .with_attribute(
            "resource_type",
            Attribute::required_string().with_description("Type of the resource to associate"),
        )
        .with_attribute(
            "resource_name",
            Attribute::required_string().with_description("Name of the resource to associate"),
        )
        .with_attribute(
            "resource_arn",
            Attribute::computed_string().with_description("ARN of the associated resource"),
        )
        .with_attribute(
            "options",
            Attribute::optional_list(AttributeType::String)
                .with_description("Options for the association eg apply application tag"),
        )
        .with_attribute(
            "id",
            Attribute::computed_string().with_description("Identifier of the resource association"),
        )
}

/// Plan a create (no prior state) or a change to an existing association.
///
/// Computed attributes are unknown on create and carried from prior state
/// otherwise. Replacement is never requested; a real change reaches
/// [`reject_update`]. A null proposed state plans the removal of the
/// association.
pub fn plan(
    prior_state: Option<&Value>,
    proposed_state: Value,
) -> Result<PlanResult, ProviderError> {
    if proposed_state.is_null() {
        let prior = prior_state.cloned().unwrap_or(Value::Null);
        let changes = diff_attributes(&prior, &Value::Null);
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    }

    let proposed = ResourceAssociation::from_value(&proposed_state)?;

    let (planned, baseline) = match prior_state {
        None => (
            ResourceAssociation {
                resource_arn: None,
                id: None,
                ..proposed
            },
            Value::Null,
        ),
        Some(prior) => {
            let prior_assoc = ResourceAssociation::from_value(prior)?;
            (
                ResourceAssociation {
                    resource_arn: prior_assoc.resource_arn,
                    id: prior_assoc.id,
                    ..proposed
                },
                prior.clone(),
            )
        },
    };

    let planned_state = planned.to_value()?;
    let changes = diff_attributes(&baseline, &planned_state);
    Ok(PlanResult::with_changes(planned_state, changes, false))
}

/// Associations are immutable; every update is rejected.
pub fn reject_update(
    _prior_state: &Value,
    _planned_state: &Value,
) -> Result<ResourceAssociation, ProviderError> {
    Err(ProviderError::UnsupportedOperation(
        "AppRegistry resource associations cannot be updated. \
         Delete and recreate the association instead."
            .to_string(),
    ))
}

/// Reconciles `resource_association` instances against AppRegistry.
pub struct ResourceAssociationReconciler<R> {
    registry: Arc<R>,
}

impl<R> Clone for ResourceAssociationReconciler<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: AppRegistry> ResourceAssociationReconciler<R> {
    /// Create a reconciler that talks to `registry`.
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// Associate the planned resource with its application.
    #[instrument(
        skip(self, planned),
        fields(application = %planned.application_arn, resource = %planned.resource_name)
    )]
    pub async fn create(
        &self,
        planned: ResourceAssociation,
    ) -> Result<ResourceAssociation, ProviderError> {
        let request = AssociateResourceRequest {
            application: planned.application_arn.clone(),
            resource_name: planned.resource_name.clone(),
            resource_type: planned.resource_type.clone(),
            options: planned.effective_options(),
        };

        let response = self
            .registry
            .associate_resource(request)
            .await
            .map_err(|e| {
                remote_context(
                    e,
                    "Error Associating resource",
                    "Could not associate resource with AppRegistry",
                )
            })?;

        let resource_arn = response.resource_arn.ok_or_else(|| ProviderError::RemoteCall {
            summary: "Error Associating resource".to_string(),
            message: "AppRegistry did not return the ARN of the associated resource".to_string(),
        })?;

        let created = planned.mark_created(resource_arn);
        info!(id = created.id.as_deref().unwrap_or_default(), "Resource associated");
        Ok(created)
    }

    /// Check that the stored association still exists upstream.
    ///
    /// Only presence is verified; attribute values are returned as stored.
    #[instrument(skip(self, state), fields(application = %state.application_arn))]
    pub async fn read(&self, state: ResourceAssociation) -> Result<ReadOutcome, ProviderError> {
        let registry = &self.registry;
        let application = state.application_arn.as_str();

        let resources =
            collect_pages(move |token| registry.list_associated_resources(application, token))
                .await
                .map_err(|e| {
                    remote_context(
                        e,
                        "Error reading resource Association",
                        "Could not read Appregistry resource association",
                    )
                })?;

        let found = match state.resource_arn.as_deref() {
            Some(arn) => resources.iter().any(|resource| resource.arn == arn),
            None => false,
        };

        if found {
            debug!(associated = resources.len(), "Association still present");
            Ok(ReadOutcome::Present(state))
        } else {
            warn!(
                resource_arn = state.resource_arn.as_deref().unwrap_or_default(),
                "Association no longer present upstream, dropping state"
            );
            Ok(ReadOutcome::Absent)
        }
    }

    /// Disassociate the stored resource from its application.
    ///
    /// Uses the identifiers from state as they are; nothing is re-read first
    /// and nothing is verified afterwards.
    #[instrument(
        skip(self, state),
        fields(application = %state.application_arn, resource = %state.resource_name)
    )]
    pub async fn delete(&self, state: &ResourceAssociation) -> Result<(), ProviderError> {
        let request = DisassociateResourceRequest {
            application: state.application_arn.clone(),
            resource_name: state.resource_name.clone(),
            resource_type: state.resource_type.clone(),
        };

        self.registry
            .disassociate_resource(request)
            .await
            .map_err(|e| {
                remote_context(
                    e,
                    "Error Disassociating resource",
                    "could not disassociate resource from Appregistry",
                )
            })?;

        info!("Resource disassociated");
        Ok(())
    }
}

/// Re-label a registry failure for the step that issued it.
fn remote_context(err: ProviderError, summary: &str, prefix: &str) -> ProviderError {
    match err {
        ProviderError::RemoteCall { message, .. } => ProviderError::RemoteCall {
            summary: summary.to_string(),
            message: format!("{}: {}", prefix, message),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::APPLY_APPLICATION_TAG;
    use crate::registry::AssociatedResource;
    use crate::testing::{MockAppRegistry, RegistryCall, RegistryOperation};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    const APP_ARN: &str = "arn:aws:servicecatalog:eu-west-2:123456789012:/applications/app1";

    fn reconciler(registry: &MockAppRegistry) -> ResourceAssociationReconciler<MockAppRegistry> {
        ResourceAssociationReconciler::new(Arc::new(registry.clone()))
    }

    fn planned() -> ResourceAssociation {
        ResourceAssociation::new(APP_ARN, "CFN_STACK", "my-stack")
    }

    fn stack(name: &str, arn: &str) -> AssociatedResource {
        AssociatedResource {
            arn: arn.to_string(),
            name: name.to_string(),
            resource_type: "CFN_STACK".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_sends_default_option() {
        let registry = MockAppRegistry::new();
        let created = assert_ok!(reconciler(&registry).create(planned()).await);

        let calls = registry.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            RegistryCall::AssociateResource(request) => {
                assert_eq!(request.options, vec![APPLY_APPLICATION_TAG.to_string()]);
                assert_eq!(request.application, APP_ARN);
                assert_eq!(request.resource_name, "my-stack");
                assert_eq!(request.resource_type, "CFN_STACK");
            },
            other => panic!("unexpected call {:?}", other),
        }
        assert!(created.options.is_none());
    }

    #[tokio::test]
    async fn test_create_sends_configured_options() {
        let registry = MockAppRegistry::new();
        let assoc = planned().with_options(["APPLY_APPLICATION_TAG", "OTHER"]);
        assert_ok!(reconciler(&registry).create(assoc).await);

        match &registry.calls()[0] {
            RegistryCall::AssociateResource(request) => {
                assert_eq!(request.options, vec!["APPLY_APPLICATION_TAG", "OTHER"]);
            },
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_derives_id() {
        let registry = MockAppRegistry::new().with_resource_arn("my-stack", "arn:stack/my-stack");
        let created = assert_ok!(reconciler(&registry).create(planned()).await);

        assert_eq!(created.resource_arn.as_deref(), Some("arn:stack/my-stack"));
        assert_eq!(created.id, Some(format!("{}:{}", APP_ARN, "arn:stack/my-stack")));
    }

    #[tokio::test]
    async fn test_create_remote_failure() {
        let registry =
            MockAppRegistry::new().fail_on(RegistryOperation::AssociateResource, "AccessDenied");
        let err = assert_err!(reconciler(&registry).create(planned()).await);

        match err {
            ProviderError::RemoteCall { summary, message } => {
                assert_eq!(summary, "Error Associating resource");
                assert!(message.starts_with("Could not associate resource with AppRegistry"));
                assert!(message.contains("AccessDenied"));
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_without_resource_arn_fails() {
        let registry = MockAppRegistry::new().omitting_resource_arn();
        let err = assert_err!(reconciler(&registry).create(planned()).await);
        assert!(err.is_remote());
        assert!(err.message().contains("did not return the ARN"));
    }

    #[tokio::test]
    async fn test_read_present_returns_state_unchanged() {
        let registry = MockAppRegistry::new();
        let reconciler = reconciler(&registry);
        let created = reconciler.create(planned()).await.unwrap();

        let outcome = assert_ok!(reconciler.read(created.clone()).await);
        assert_eq!(outcome, ReadOutcome::Present(created));
    }

    #[tokio::test]
    async fn test_read_absent_is_not_an_error() {
        let registry = MockAppRegistry::new().with_associated(APP_ARN, stack("other", "arn:other"));
        let state = planned().mark_created("arn:gone");

        let outcome = assert_ok!(reconciler(&registry).read(state).await);
        assert_eq!(outcome, ReadOutcome::Absent);
    }

    #[tokio::test]
    async fn test_read_deleted_application_is_an_error() {
        let registry = MockAppRegistry::new();
        let state = planned().mark_created("arn:stack/my-stack");

        let err = assert_err!(reconciler(&registry).read(state).await);
        match err {
            ProviderError::RemoteCall { summary, message } => {
                assert_eq!(summary, "Error reading resource Association");
                assert!(message.contains("ResourceNotFoundException"));
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_scans_every_page() {
        let mut registry = MockAppRegistry::new().with_page_size(2);
        for i in 0..5 {
            let arn = format!("arn:stack/{}", i);
            registry = registry.with_associated(APP_ARN, stack(&format!("stack-{}", i), &arn));
        }
        let state = planned().mark_created("arn:stack/4");

        let outcome = assert_ok!(reconciler(&registry).read(state.clone()).await);
        assert_eq!(outcome, ReadOutcome::Present(state));

        let list_calls = registry
            .calls()
            .into_iter()
            .filter(|c| matches!(c, RegistryCall::ListAssociatedResources { .. }))
            .count();
        assert_eq!(list_calls, 3);
    }

    #[tokio::test]
    async fn test_read_remote_failure() {
        let registry =
            MockAppRegistry::new().fail_on(RegistryOperation::ListAssociatedResources, "throttled");
        let state = planned().mark_created("arn:x");

        let err = assert_err!(reconciler(&registry).read(state).await);
        assert!(err.is_remote());
        assert!(err.message().contains("throttled"));
    }

    #[test]
    fn test_update_always_rejected() {
        let prior = json!({
            "application_arn": APP_ARN,
            "resource_type": "CFN_STACK",
            "resource_name": "a"
        });
        let mut renamed = prior.clone();
        renamed["resource_name"] = json!("b");

        for (prior, planned) in [
            (json!({}), json!({})),
            (Value::Null, Value::Null),
            (prior.clone(), prior.clone()),
            (prior, renamed),
        ] {
            let err = assert_err!(reject_update(&prior, &planned));
            assert!(matches!(err, ProviderError::UnsupportedOperation(_)));
        }
    }

    #[tokio::test]
    async fn test_delete_uses_stored_identifiers() {
        let registry = MockAppRegistry::new();
        let state =
            ResourceAssociation::new(APP_ARN, "CFN_STACK", "stale-name").mark_created("arn:x");

        assert_ok!(reconciler(&registry).delete(&state).await);

        assert_eq!(
            registry.calls(),
            vec![RegistryCall::DisassociateResource(DisassociateResourceRequest {
                application: APP_ARN.to_string(),
                resource_name: "stale-name".to_string(),
                resource_type: "CFN_STACK".to_string(),
            })]
        );
    }

    #[tokio::test]
    async fn test_delete_remote_failure() {
        let registry =
            MockAppRegistry::new().fail_on(RegistryOperation::DisassociateResource, "boom");
        let err = assert_err!(reconciler(&registry).delete(&planned()).await);
        match err {
            ProviderError::RemoteCall { summary, message } => {
                assert_eq!(summary, "Error Disassociating resource");
                assert_eq!(message, "could not disassociate resource from Appregistry: boom");
            },
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_plan_create_leaves_computed_unknown() {
        let plan = plan(
            None,
            json!({
                "application_arn": APP_ARN,
                "resource_type": "CFN_STACK",
                "resource_name": "my-stack",
                "resource_arn": null,
                "options": null,
                "id": null
            }),
        )
        .unwrap();

        assert!(plan.planned_state["id"].is_null());
        assert!(plan.planned_state["resource_arn"].is_null());
        assert!(!plan.requires_replace);
        let paths: Vec<&str> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["application_arn", "resource_name", "resource_type"]);
    }

    #[test]
    fn test_plan_existing_carries_computed() {
        let prior = planned().mark_created("arn:stack").to_value().unwrap();
        let proposed = json!({
            "application_arn": APP_ARN,
            "resource_type": "CFN_STACK",
            "resource_name": "my-stack",
            "resource_arn": null,
            "id": null
        });

        let plan = plan(Some(&prior), proposed).unwrap();
        assert!(plan.changes.is_empty());
        assert_eq!(plan.planned_state, prior);
    }

    #[test]
    fn test_plan_existing_with_change() {
        let prior = planned().mark_created("arn:stack").to_value().unwrap();
        let mut proposed = prior.clone();
        proposed["resource_name"] = json!("renamed");

        let plan = plan(Some(&prior), proposed).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "resource_name");
        assert!(!plan.requires_replace);
    }

    #[test]
    fn test_plan_removal() {
        let prior = planned().mark_created("arn:stack").to_value().unwrap();

        let plan = plan(Some(&prior), Value::Null).unwrap();
        assert!(plan.planned_state.is_null());
        assert!(plan.changes.iter().all(|c| c.after.is_none()));
        assert_eq!(plan.changes.len(), 5);
    }

    #[test]
    fn test_schema_flags() {
        let schema = schema();
        for name in ["application_arn", "resource_type", "resource_name"] {
            assert!(schema.attribute(name).unwrap().flags.required, "{}", name);
        }
        assert!(schema.attribute("resource_arn").unwrap().flags.is_computed_only());
        assert!(schema.attribute("id").unwrap().flags.is_computed_only());
        assert!(schema.attribute("options").unwrap().flags.optional);
    }
}
