//! Resource schema types
//!
//! Types for representing the schema of an external system: object classes
//! grouping attribute definitions. Fetched live from connectors and cached
//! on the resource definition.

use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ConnectorResult};

/// Schema of a target system: one or more object classes, each with its
/// own attribute definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The object classes available in this schema.
    pub object_classes: Vec<ObjectClass>,
}

impl Schema {
    /// Create a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            object_classes: Vec::new(),
        }
    }

    /// Create a schema with the given object classes.
    #[must_use]
    pub fn with_object_classes(object_classes: Vec<ObjectClass>) -> Self {
        Self { object_classes }
    }

    /// Add an object class to the schema.
    pub fn add_object_class(&mut self, object_class: ObjectClass) {
        self.object_classes.push(object_class);
    }

    /// Find an object class by name.
    #[must_use]
    pub fn get_object_class(&self, name: &str) -> Option<&ObjectClass> {
        self.object_classes.iter().find(|oc| oc.name == name)
    }

    /// Find an object class by name, mutably.
    pub fn get_object_class_mut(&mut self, name: &str) -> Option<&mut ObjectClass> {
        self.object_classes.iter_mut().find(|oc| oc.name == name)
    }

    /// Check whether the schema carries no definitions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_classes.is_empty()
    }

    /// Get all object class names.
    #[must_use]
    pub fn object_class_names(&self) -> Vec<&str> {
        self.object_classes
            .iter()
            .map(|oc| oc.name.as_str())
            .collect()
    }

    /// Sanity-check the schema: every object class must carry at least one
    /// attribute definition and attribute names must be unique within
    /// their class.
    pub fn check(&self) -> ConnectorResult<()> {
        for object_class in &self.object_classes {
            if object_class.attributes.is_empty() {
                return Err(ConnectorError::schema(format!(
                    "object class '{}' has no attribute definitions",
                    object_class.name
                )));
            }
            let mut seen = std::collections::HashSet::new();
            for attribute in &object_class.attributes {
                if !seen.insert(attribute.name.as_str()) {
                    return Err(ConnectorError::schema(format!(
                        "duplicate attribute definition '{}' in object class '{}'",
                        attribute.name, object_class.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// An object class in a target system schema (e.g. account, group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectClass {
    /// Canonical name for this object class.
    pub name: String,

    /// Native name in the target system (e.g. "inetOrgPerson" for LDAP).
    pub native_name: String,

    /// Attributes belonging to this object class.
    pub attributes: Vec<SchemaAttribute>,
}

impl ObjectClass {
    /// Create a new object class with the given names.
    pub fn new(name: impl Into<String>, native_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_name: native_name.into(),
            attributes: Vec::new(),
        }
    }

    /// Add an attribute using the builder pattern.
    #[must_use]
    pub fn with_attribute(mut self, attribute: SchemaAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Find an attribute definition by name.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Find an attribute definition by name, mutably.
    pub fn get_attribute_mut(&mut self, name: &str) -> Option<&mut SchemaAttribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Check if an attribute exists.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Get all required attributes.
    #[must_use]
    pub fn required_attributes(&self) -> Vec<&SchemaAttribute> {
        self.attributes.iter().filter(|a| a.required).collect()
    }
}

/// An attribute in an object class schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaAttribute {
    /// Canonical name for this attribute.
    pub name: String,

    /// Native name in the target system.
    pub native_name: String,

    /// Data type of this attribute.
    pub data_type: AttributeDataType,

    /// Whether this attribute can have multiple values.
    #[serde(default)]
    pub multi_valued: bool,

    /// Whether this attribute is required for create operations.
    #[serde(default)]
    pub required: bool,

    /// Whether this attribute is ignored for normal attribute processing.
    /// Set by capability negotiation for attributes that simulate a
    /// capability (such as activation): the attribute must not also be
    /// settable under its native name.
    #[serde(default)]
    pub ignored: bool,
}

impl SchemaAttribute {
    /// Create a new attribute with the given names and type.
    pub fn new(
        name: impl Into<String>,
        native_name: impl Into<String>,
        data_type: AttributeDataType,
    ) -> Self {
        Self {
            name: name.into(),
            native_name: native_name.into(),
            data_type,
            multi_valued: false,
            required: false,
            ignored: false,
        }
    }

    /// Mark this attribute as multi-valued.
    #[must_use]
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Mark this attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark this attribute as ignored.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }
}

/// Data type for schema attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeDataType {
    /// String/text value.
    String,
    /// Integer value.
    Integer,
    /// Boolean value.
    Boolean,
    /// Binary data (bytes).
    Binary,
    /// Date/time value.
    DateTime,
}

impl AttributeDataType {
    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDataType::String => "string",
            AttributeDataType::Integer => "integer",
            AttributeDataType::Boolean => "boolean",
            AttributeDataType::Binary => "binary",
            AttributeDataType::DateTime => "datetime",
        }
    }
}

impl std::fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_class() -> ObjectClass {
        ObjectClass::new("account", "inetOrgPerson")
            .with_attribute(
                SchemaAttribute::new("uid", "uid", AttributeDataType::String).required(),
            )
            .with_attribute(SchemaAttribute::new("cn", "cn", AttributeDataType::String))
            .with_attribute(
                SchemaAttribute::new("mail", "mail", AttributeDataType::String).multi_valued(),
            )
    }

    #[test]
    fn test_object_class_lookup() {
        let mut schema = Schema::new();
        schema.add_object_class(account_class());

        assert!(schema.get_object_class("account").is_some());
        assert!(schema.get_object_class("group").is_none());
        assert_eq!(schema.object_class_names(), vec!["account"]);
        assert!(!schema.is_empty());
    }

    #[test]
    fn test_attribute_lookup() {
        let class = account_class();
        assert!(class.has_attribute("mail"));
        assert!(class.get_attribute("mail").unwrap().multi_valued);
        assert_eq!(class.required_attributes().len(), 1);
        assert!(class.get_attribute("missing").is_none());
    }

    #[test]
    fn test_schema_check_rejects_empty_class() {
        let schema = Schema::with_object_classes(vec![ObjectClass::new("account", "account")]);
        assert!(schema.check().is_err());
    }

    #[test]
    fn test_schema_check_rejects_duplicates() {
        let class = ObjectClass::new("account", "account")
            .with_attribute(SchemaAttribute::new("cn", "cn", AttributeDataType::String))
            .with_attribute(SchemaAttribute::new("cn", "cn", AttributeDataType::String));
        let schema = Schema::with_object_classes(vec![class]);
        assert!(schema.check().is_err());
    }

    #[test]
    fn test_schema_serde_roundtrip() {
        let schema = Schema::with_object_classes(vec![account_class()]);
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, schema);
    }
}
