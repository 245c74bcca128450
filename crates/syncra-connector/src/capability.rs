//! Connector capabilities
//!
//! A capability declares a feature a target system supports (or simulates).
//! Each resource carries two capability layers: the `native` set fetched
//! from the connector and an optional `configured` set of administrative
//! overrides. Consumers must always go through [`CapabilitySet::effective`]
//! rather than reading either layer directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single capability of a target system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// The target system supports enabling/disabling objects. When
    /// `attribute` is set the capability is simulated on top of a plain
    /// attribute of the target system.
    Activation {
        /// Whether the capability is enabled.
        #[serde(default = "default_true")]
        enabled: bool,
        /// Attribute that simulates the activation state, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
        /// Whether the simulating attribute should be hidden from normal
        /// attribute processing.
        #[serde(default)]
        ignore_attribute: bool,
    },
    /// The target system supports password credentials.
    Credentials {
        #[serde(default = "default_true")]
        enabled: bool,
    },
    /// The target system can report changes incrementally.
    LiveSync {
        #[serde(default = "default_true")]
        enabled: bool,
    },
    /// The target system supports connection testing.
    TestConnection {
        #[serde(default = "default_true")]
        enabled: bool,
    },
    /// The target system supports paged search.
    PagedSearch {
        #[serde(default = "default_true")]
        enabled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_page_size: Option<u32>,
    },
}

fn default_true() -> bool {
    true
}

impl Capability {
    /// The kind of this capability.
    #[must_use]
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Activation { .. } => CapabilityKind::Activation,
            Capability::Credentials { .. } => CapabilityKind::Credentials,
            Capability::LiveSync { .. } => CapabilityKind::LiveSync,
            Capability::TestConnection { .. } => CapabilityKind::TestConnection,
            Capability::PagedSearch { .. } => CapabilityKind::PagedSearch,
        }
    }

    /// Whether this capability is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        match self {
            Capability::Activation { enabled, .. }
            | Capability::Credentials { enabled }
            | Capability::LiveSync { enabled }
            | Capability::TestConnection { enabled }
            | Capability::PagedSearch { enabled, .. } => *enabled,
        }
    }
}

/// Discriminant for capability variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Activation,
    Credentials,
    LiveSync,
    TestConnection,
    PagedSearch,
}

impl CapabilityKind {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Activation => "activation",
            CapabilityKind::Credentials => "credentials",
            CapabilityKind::LiveSync => "live_sync",
            CapabilityKind::TestConnection => "test_connection",
            CapabilityKind::PagedSearch => "paged_search",
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two capability layers of a resource, plus the fetch timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// Capabilities reported by the connector.
    #[serde(default)]
    pub native: Vec<Capability>,

    /// Administrative overrides. A configured capability of a given kind
    /// replaces the native one of the same kind entirely.
    #[serde(default)]
    pub configured: Vec<Capability>,

    /// When the native capabilities were last fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl CapabilitySet {
    /// Create an empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the effective capability of the given kind: the configured
    /// override when present, the native capability otherwise.
    #[must_use]
    pub fn effective(&self, kind: CapabilityKind) -> Option<&Capability> {
        self.configured
            .iter()
            .find(|c| c.kind() == kind)
            .or_else(|| self.native.iter().find(|c| c.kind() == kind))
    }

    /// Whether the effective capability of the given kind exists and is
    /// enabled.
    #[must_use]
    pub fn supports(&self, kind: CapabilityKind) -> bool {
        self.effective(kind).is_some_and(Capability::is_enabled)
    }

    /// Whether capability metadata has ever been fetched and cached.
    #[must_use]
    pub fn has_cached_metadata(&self) -> bool {
        self.cached_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_prefers_configured() {
        let set = CapabilitySet {
            native: vec![Capability::LiveSync { enabled: true }],
            configured: vec![Capability::LiveSync { enabled: false }],
            cached_at: Some(Utc::now()),
        };
        let effective = set.effective(CapabilityKind::LiveSync).unwrap();
        assert!(!effective.is_enabled());
        assert!(!set.supports(CapabilityKind::LiveSync));
    }

    #[test]
    fn test_effective_falls_back_to_native() {
        let set = CapabilitySet {
            native: vec![Capability::Credentials { enabled: true }],
            configured: vec![],
            cached_at: Some(Utc::now()),
        };
        assert!(set.supports(CapabilityKind::Credentials));
        assert!(!set.supports(CapabilityKind::Activation));
    }

    #[test]
    fn test_configured_only_capability() {
        // Simulated activation exists only in the configured layer.
        let set = CapabilitySet {
            native: vec![],
            configured: vec![Capability::Activation {
                enabled: true,
                attribute: Some("ds-pwp-account-disabled".to_string()),
                ignore_attribute: true,
            }],
            cached_at: None,
        };
        let effective = set.effective(CapabilityKind::Activation).unwrap();
        match effective {
            Capability::Activation {
                attribute,
                ignore_attribute,
                ..
            } => {
                assert_eq!(attribute.as_deref(), Some("ds-pwp-account-disabled"));
                assert!(ignore_attribute);
            }
            other => panic!("unexpected capability: {other:?}"),
        }
    }

    #[test]
    fn test_cached_metadata_tracks_cache_timestamp() {
        let mut set = CapabilitySet::new();
        assert!(!set.has_cached_metadata());

        // An empty fetch result still counts as cached metadata.
        set.cached_at = Some(Utc::now());
        assert!(set.has_cached_metadata());
    }

    #[test]
    fn test_serde_tagged_representation() {
        let capability = Capability::Activation {
            enabled: true,
            attribute: Some("status".to_string()),
            ignore_attribute: false,
        };
        let json = serde_json::to_value(&capability).unwrap();
        assert_eq!(json["type"], "activation");
        assert_eq!(json["attribute"], "status");
        let parsed: Capability = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, capability);
    }
}
