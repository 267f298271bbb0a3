//! Error types for the AppRegistry provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while serving provider callbacks.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A call to the AppRegistry service failed.
    ///
    /// `summary` names the failed step; `message` is the upstream error text,
    /// passed through unchanged.
    #[error("{summary}: {message}")]
    RemoteCall {
        /// Short description of the failed step.
        summary: String,
        /// The upstream error message.
        message: String,
    },

    /// The requested lifecycle operation is not supported.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Build a [`ProviderError::RemoteCall`] from any displayable upstream error.
    pub fn remote(summary: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::RemoteCall {
            summary: summary.into(),
            message: err.to_string(),
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::RemoteCall { message, .. } => message,
            Self::UnsupportedOperation(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
        }
    }

    /// Whether this error came from the remote registry.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteCall { .. })
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RemoteCall { summary, message } => {
                Diagnostic::error(summary).with_detail(message)
            },
            ProviderError::UnsupportedOperation(msg) => {
                Diagnostic::error("Update Not Supported").with_detail(msg)
            },
            ProviderError::Validation(msg) => {
                Diagnostic::error("Invalid configuration").with_detail(msg)
            },
            ProviderError::Configuration(msg) => {
                Diagnostic::error("Provider configuration error").with_detail(msg)
            },
            ProviderError::UnknownResource(msg) => {
                Diagnostic::error("Unknown resource type").with_detail(msg)
            },
            ProviderError::Serialization(err) => {
                Diagnostic::error("Serialization error").with_detail(err.to_string())
            },
        }
    }
}
