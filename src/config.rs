//! Provider configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Attribute, Diagnostic, Schema};
use crate::validation::validate;

/// Configuration accepted by the provider block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// AWS region the AppRegistry client talks to.
    pub region: String,
}

impl ProviderConfig {
    /// Create a configuration for the given region.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    /// Schema of the provider block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Interact with aws service catalog app registry")
            .with_attribute(
                "region",
                Attribute::required_string().with_description("AWS region"),
            )
    }

    /// Validate a raw configuration payload.
    ///
    /// On top of the schema checks, `region` must not be blank.
    pub fn validate(value: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validate(&Self::schema(), value);
        if !diagnostics.is_empty() {
            return diagnostics;
        }

        if let Some(region) = value.get("region").and_then(Value::as_str) {
            if region.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error("Invalid attribute value 'region'")
                        .with_detail("region must not be empty")
                        .with_attribute("region"),
                );
            }
        }
        diagnostics
    }

    /// Decode a configuration payload, rejecting it if validation fails.
    pub fn from_value(value: &Value) -> Result<Self, ProviderError> {
        if let Some(first) = Self::validate(value).into_iter().next() {
            let detail = first.detail.unwrap_or_default();
            return Err(ProviderError::Validation(format!(
                "{}: {}",
                first.summary, detail
            )));
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_config() {
        assert!(ProviderConfig::validate(&json!({"region": "eu-west-2"})).is_empty());
        let config = ProviderConfig::from_value(&json!({"region": "eu-west-2"})).unwrap();
        assert_eq!(config, ProviderConfig::new("eu-west-2"));
    }

    #[test]
    fn test_missing_region() {
        let diagnostics = ProviderConfig::validate(&json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("region"));

        let err = ProviderConfig::from_value(&json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.message().contains("region"));
    }

    #[test]
    fn test_blank_region() {
        let diagnostics = ProviderConfig::validate(&json!({"region": "  "}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].detail.as_deref(), Some("region must not be empty"));
    }

    #[test]
    fn test_schema_marks_region_required() {
        let schema = ProviderConfig::schema();
        let region = schema.attribute("region").unwrap();
        assert!(region.flags.required);
        assert_eq!(region.description.as_deref(), Some("AWS region"));
    }
}
