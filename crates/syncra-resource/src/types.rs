//! Resource definition types
//!
//! A [`ResourceDefinition`] is the stored description of one external
//! system: which connector talks to it, how that connector is configured,
//! and the schema/capability enrichment fetched from the live system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use syncra_connector::{CapabilitySet, ConnectorId, ResourceId, Schema};

/// Last observed availability of the target system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// The target system answered its last connection test.
    Up,
    /// The target system failed its last connection test.
    Down,
    /// No connection test has run yet.
    #[default]
    Unknown,
}

impl AvailabilityStatus {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::Up => "up",
            AvailabilityStatus::Down => "down",
            AvailabilityStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stored definition of an external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Unique identifier.
    pub id: ResourceId,

    /// Human-readable name.
    pub name: String,

    /// Repository version, bumped on every write. Cache keys embed it so
    /// stale entries are never served.
    pub version: u64,

    /// The connector type used to reach the target system.
    pub connector_id: ConnectorId,

    /// Connector configuration (host, port, credentials reference, ...).
    pub connector_config: Value,

    /// The resource schema: statically configured at registration or
    /// fetched from the connector during completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// When the schema was last fetched from the connector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_fetched_at: Option<DateTime<Utc>>,

    /// Capability layers and their caching metadata.
    #[serde(default)]
    pub capabilities: CapabilitySet,

    /// Last observed availability.
    #[serde(default)]
    pub availability: AvailabilityStatus,
}

impl ResourceDefinition {
    /// Create a new, not-yet-completed resource definition.
    #[must_use]
    pub fn new(name: impl Into<String>, connector_id: ConnectorId, connector_config: Value) -> Self {
        Self {
            id: ResourceId::new(),
            name: name.into(),
            version: 0,
            connector_id,
            connector_config,
            schema: None,
            schema_fetched_at: None,
            capabilities: CapabilitySet::new(),
            availability: AvailabilityStatus::Unknown,
        }
    }

    /// Whether this definition needs no completion: it has a non-empty
    /// schema and its capabilities carry caching metadata.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.schema.as_ref().is_some_and(|s| !s.is_empty())
            && self.capabilities.has_cached_metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncra_connector::{AttributeDataType, Capability, ObjectClass, SchemaAttribute};

    fn minimal_schema() -> Schema {
        Schema::with_object_classes(vec![ObjectClass::new("account", "account").with_attribute(
            SchemaAttribute::new("uid", "uid", AttributeDataType::String),
        )])
    }

    #[test]
    fn test_new_resource_is_incomplete() {
        let resource = ResourceDefinition::new(
            "corp-ldap",
            ConnectorId::new(),
            serde_json::json!({"host": "ldap.example.com"}),
        );
        assert!(!resource.is_complete());
        assert_eq!(resource.availability, AvailabilityStatus::Unknown);
    }

    #[test]
    fn test_complete_requires_schema_and_capability_metadata() {
        let mut resource =
            ResourceDefinition::new("corp-ldap", ConnectorId::new(), serde_json::json!({}));

        resource.schema = Some(minimal_schema());
        assert!(!resource.is_complete());

        resource.capabilities.native = vec![Capability::Credentials { enabled: true }];
        resource.capabilities.cached_at = Some(Utc::now());
        assert!(resource.is_complete());

        // An empty schema does not count as a schema.
        resource.schema = Some(Schema::new());
        assert!(!resource.is_complete());
    }
}
