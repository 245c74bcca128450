//! Mapping rule model
//!
//! Read-only configuration loaded per resource: for each resource
//! attribute, at most one outbound rule (identity to resource) and any
//! number of independent inbound rules (resource to identity).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use syncra_connector::AttributePath;

/// All mapping rules declared for one resource attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMapping {
    /// The resource attribute these rules belong to.
    pub attribute: String,

    /// Identity-to-resource rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<OutboundRule>,

    /// Resource-to-identity rules, each evaluated independently.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbound: Vec<InboundRule>,
}

impl AttributeMapping {
    /// A mapping for the given attribute with no rules yet.
    pub fn new(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            outbound: None,
            inbound: Vec::new(),
        }
    }

    /// Set the outbound rule.
    #[must_use]
    pub fn with_outbound(mut self, rule: OutboundRule) -> Self {
        self.outbound = Some(rule);
        self
    }

    /// Add an inbound rule.
    #[must_use]
    pub fn with_inbound(mut self, rule: InboundRule) -> Self {
        self.inbound.push(rule);
        self
    }
}

/// An identity-to-resource rule producing one scalar value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutboundRule {
    /// Script evaluated against the variable bindings. Takes precedence
    /// over `literal` when both are present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    /// Literal string segments, concatenated in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub literal: Vec<String>,

    /// Variables made available to the expression, resolved fresh for
    /// this rule only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableDeclaration>,

    /// Apply only when the target attribute currently has no value.
    #[serde(default)]
    pub default_only: bool,
}

impl OutboundRule {
    /// A rule computing its value from an expression.
    pub fn from_expression(expression: impl Into<String>) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Self::default()
        }
    }

    /// A rule producing a literal value from the given segments.
    pub fn from_literal(segments: Vec<String>) -> Self {
        Self {
            literal: segments,
            ..Self::default()
        }
    }

    /// Declare a variable for this rule.
    #[must_use]
    pub fn with_variable(mut self, declaration: VariableDeclaration) -> Self {
        self.variables.push(declaration);
        self
    }

    /// Mark this rule default-only.
    #[must_use]
    pub fn default_only(mut self) -> Self {
        self.default_only = true;
        self
    }
}

/// A resource-to-identity rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundRule {
    /// Path in the identity tree the source values land at.
    pub target: AttributePath,

    /// Value filters applied to each value, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,

    /// Tolerant rules append to an existing target instead of replacing
    /// it, so several inbound rules can coexist on one path.
    #[serde(default)]
    pub tolerant: bool,
}

impl InboundRule {
    /// A rule targeting the given identity path.
    pub fn new(target: impl Into<AttributePath>) -> Self {
        Self {
            target: target.into(),
            filters: Vec::new(),
            tolerant: false,
        }
    }

    /// Append a filter to the chain.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    /// Mark this rule tolerant.
    #[must_use]
    pub fn tolerant(mut self) -> Self {
        self.tolerant = true;
        self
    }
}

/// A reference to a registered value filter plus its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Registry name of the filter.
    pub name: String,

    /// Filter-specific configuration (e.g. a regex pattern).
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

impl FilterSpec {
    /// A filter reference with no configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Value::Null,
        }
    }

    /// A filter reference with configuration.
    pub fn with_config(name: impl Into<String>, config: Value) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// A variable made available to an outbound expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Name the expression sees.
    pub name: String,

    /// Inline value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Reference to an object fetched through the object resolver. Used
    /// when `value` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_ref: Option<ObjectRef>,
}

impl VariableDeclaration {
    /// A variable bound to an inline value.
    pub fn literal(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            object_ref: None,
        }
    }

    /// A variable bound to a resolved object.
    pub fn reference(name: impl Into<String>, kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            object_ref: Some(ObjectRef {
                kind: kind.into(),
                id: id.into(),
            }),
        }
    }
}

/// A typed object reference for variable dereference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Object kind (e.g. "identity", "org").
    pub kind: String,
    /// Object identifier.
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_serde_roundtrip() {
        let mapping = AttributeMapping::new("cn")
            .with_outbound(
                OutboundRule::from_expression(r#"given_name + " " + sn"#)
                    .with_variable(VariableDeclaration::literal("given_name", json!("Jack")))
                    .default_only(),
            )
            .with_inbound(
                InboundRule::new("name.full")
                    .with_filter(FilterSpec::new("trim"))
                    .tolerant(),
            );

        let json = serde_json::to_string(&mapping).unwrap();
        let parsed: AttributeMapping = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_defaults_are_lenient() {
        let parsed: AttributeMapping =
            serde_json::from_value(json!({"attribute": "mail"})).unwrap();
        assert!(parsed.outbound.is_none());
        assert!(parsed.inbound.is_empty());
    }
}
