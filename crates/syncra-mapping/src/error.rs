//! Mapping engine errors

use syncra_connector::ErrorKind;
use thiserror::Error;

/// Errors from mapping evaluation.
///
/// Per-rule failures are isolated into sub-results by the engine; only
/// structural and configuration errors surface as `Err` to callers.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The mapping setup itself is unusable (e.g. filters declared with
    /// no filter registry installed).
    #[error("mapping configuration error: {message}")]
    Configuration { message: String },

    /// A structural problem with the objects or paths being mapped.
    #[error("mapping schema error: {message}")]
    Schema { message: String },

    /// An expression failed to compile or evaluate.
    #[error("expression error: {message}")]
    Expression { message: String },

    /// A value filter failed to apply.
    #[error("filter '{filter}' failed: {message}")]
    Filter { filter: String, message: String },

    /// A declared variable could not be resolved.
    #[error("cannot resolve variable '{name}': {message}")]
    UnresolvedVariable { name: String, message: String },
}

impl MappingError {
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

    /// Create an expression error.
    pub fn expression(message: impl Into<String>) -> Self {
        Self::Expression {
            message: message.into(),
        }
    }

    /// Classify this error into the shared taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            MappingError::Configuration { .. } => ErrorKind::Configuration,
            MappingError::Schema { .. }
            | MappingError::Expression { .. }
            | MappingError::Filter { .. } => ErrorKind::Schema,
            MappingError::UnresolvedVariable { .. } => ErrorKind::NotFound,
        }
    }
}

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
