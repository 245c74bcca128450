//! Resource layer errors

use syncra_connector::{ConnectorError, ErrorKind, ResourceId};
use thiserror::Error;

/// Errors from resource management operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource does not exist in the repository.
    #[error("resource not found: {resource_id}")]
    NotFound {
        /// The resource that was not found.
        resource_id: ResourceId,
    },

    /// A connector call failed.
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// A repository write lost a race with a concurrent change.
    #[error("conflict persisting resource {resource_id}: {message}")]
    Conflict {
        resource_id: ResourceId,
        message: String,
    },

    /// The resource or connector configuration is invalid.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The resource schema is malformed or incompatible.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Any other runtime fault.
    #[error("unexpected error: {message}")]
    Unexpected {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ResourceError {
    /// Create a conflict error.
    pub fn conflict(resource_id: ResourceId, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource_id,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
            source: None,
        }
    }

    /// Classify this error into the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::NotFound { .. } => ErrorKind::NotFound,
            ResourceError::Connector(err) => err.kind(),
            ResourceError::Conflict { .. } => ErrorKind::Conflict,
            ResourceError::Configuration { .. } => ErrorKind::Configuration,
            ResourceError::Schema { .. } => ErrorKind::Schema,
            ResourceError::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let id = ResourceId::new();
        assert_eq!(
            ResourceError::NotFound { resource_id: id }.kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ResourceError::conflict(id, "gone").kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ResourceError::configuration("bad host").kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            ResourceError::from(ConnectorError::communication("refused")).kind(),
            ErrorKind::Communication
        );
    }
}
