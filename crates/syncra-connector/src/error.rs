//! Connector framework error types
//!
//! Connectors are untrusted plugins, so every fault they can produce is
//! classified into a small taxonomy that the completion, test and mapping
//! pipelines use to decide between degrading and failing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::ConnectorId;

/// Classification of a failure, shared across the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced object or connector does not exist.
    NotFound,
    /// The target system or connector could not be reached.
    Communication,
    /// The connector or resource configuration is invalid.
    Configuration,
    /// A schema or mapping is malformed or incompatible.
    Schema,
    /// A repository write lost a race with a concurrent change.
    Conflict,
    /// Any other runtime fault, including connector panics.
    Unexpected,
}

impl ErrorKind {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Communication => "communication",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Schema => "schema",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error that can occur while dealing with a connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The connector referenced by a resource is not registered.
    #[error("connector not found: {connector_id}")]
    NotFound { connector_id: ConnectorId },

    /// The target system could not be reached.
    #[error("communication error: {message}")]
    Communication {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation did not finish within the caller's deadline.
    #[error("operation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The connector rejected its configuration.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The fetched schema is malformed or incompatible.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Any other runtime fault raised by the connector. Connectors are
    /// plugins and may fail in undocumented ways; this is the catch-all.
    #[error("unexpected connector error: {message}")]
    Unexpected {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::NotFound { .. } => ErrorKind::NotFound,
            ConnectorError::Communication { .. } | ConnectorError::Timeout { .. } => {
                ErrorKind::Communication
            }
            ConnectorError::Configuration { .. } => ErrorKind::Configuration,
            ConnectorError::Schema { .. } => ErrorKind::Schema,
            ConnectorError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    /// Create a communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        ConnectorError::Communication {
            message: message.into(),
            source: None,
        }
    }

    /// Create a communication error with source.
    pub fn communication_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Communication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        ConnectorError::Configuration {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        ConnectorError::Schema {
            message: message.into(),
        }
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        ConnectorError::Unexpected {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            ConnectorError::NotFound {
                connector_id: ConnectorId::new()
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ConnectorError::communication("down").kind(),
            ErrorKind::Communication
        );
        assert_eq!(
            ConnectorError::Timeout { timeout_secs: 5 }.kind(),
            ErrorKind::Communication
        );
        assert_eq!(
            ConnectorError::configuration("bad").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(ConnectorError::schema("bad").kind(), ErrorKind::Schema);
        assert_eq!(
            ConnectorError::unexpected("boom").kind(),
            ErrorKind::Unexpected
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::Timeout { timeout_secs: 30 };
        assert_eq!(err.to_string(), "operation timed out after 30 seconds");

        let err = ConnectorError::schema("no object classes");
        assert_eq!(err.to_string(), "schema error: no object classes");
    }

    #[test]
    fn test_error_with_source() {
        let source = std::io::Error::other("socket closed");
        let err = ConnectorError::communication_with_source("fetch failed", source);
        if let ConnectorError::Communication { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected Communication variant");
        }
    }
}
