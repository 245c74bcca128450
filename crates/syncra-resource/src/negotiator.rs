//! Capability negotiation
//!
//! Reconciles connector-reported capabilities with administrative
//! overrides and adjusts a fetched schema for capabilities that are
//! simulated on top of plain attributes.

use tracing::debug;

use syncra_connector::{Capability, CapabilityKind, CapabilitySet, Schema};

/// Adjust a fetched schema for simulated capabilities.
///
/// When the effective activation capability is simulated through an
/// attribute, that attribute's `ignored` flag is set to the capability's
/// `ignore_attribute` declaration in every object class that defines it.
/// An ignored attribute is edited only through activation semantics,
/// never under its native name. An attribute missing from the schema is
/// logged, not raised: connectors may drive activation through attributes
/// absent from their public schema.
pub fn adjust_schema_for_simulated_capabilities(schema: &mut Schema, capabilities: &CapabilitySet) {
    let Some(Capability::Activation {
        attribute: Some(attribute_name),
        ignore_attribute,
        ..
    }) = capabilities.effective(CapabilityKind::Activation)
    else {
        return;
    };

    for object_class in &mut schema.object_classes {
        match object_class.get_attribute_mut(attribute_name) {
            Some(attribute) => {
                attribute.ignored = *ignore_attribute;
            }
            None => {
                debug!(
                    object_class = %object_class.name,
                    attribute = %attribute_name,
                    "simulated activation attribute not present in object class"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncra_connector::{AttributeDataType, ObjectClass, SchemaAttribute};

    fn schema_with_disable_attribute() -> Schema {
        Schema::with_object_classes(vec![ObjectClass::new("account", "inetOrgPerson")
            .with_attribute(SchemaAttribute::new("uid", "uid", AttributeDataType::String))
            .with_attribute(SchemaAttribute::new(
                "ds-pwp-account-disabled",
                "ds-pwp-account-disabled",
                AttributeDataType::Boolean,
            ))])
    }

    fn activation_capabilities(ignore_attribute: bool) -> CapabilitySet {
        CapabilitySet {
            native: vec![],
            configured: vec![Capability::Activation {
                enabled: true,
                attribute: Some("ds-pwp-account-disabled".to_string()),
                ignore_attribute,
            }],
            cached_at: None,
        }
    }

    #[test]
    fn test_ignore_attribute_true_marks_ignored() {
        let mut schema = schema_with_disable_attribute();
        adjust_schema_for_simulated_capabilities(&mut schema, &activation_capabilities(true));

        let attribute = schema
            .get_object_class("account")
            .unwrap()
            .get_attribute("ds-pwp-account-disabled")
            .unwrap();
        assert!(attribute.ignored);
    }

    #[test]
    fn test_ignore_attribute_false_clears_ignored() {
        let mut schema = schema_with_disable_attribute();
        schema
            .get_object_class_mut("account")
            .unwrap()
            .get_attribute_mut("ds-pwp-account-disabled")
            .unwrap()
            .ignored = true;

        adjust_schema_for_simulated_capabilities(&mut schema, &activation_capabilities(false));

        let attribute = schema
            .get_object_class("account")
            .unwrap()
            .get_attribute("ds-pwp-account-disabled")
            .unwrap();
        assert!(!attribute.ignored);
    }

    #[test]
    fn test_missing_attribute_is_tolerated() {
        let mut schema = Schema::with_object_classes(vec![ObjectClass::new("group", "group")
            .with_attribute(SchemaAttribute::new("cn", "cn", AttributeDataType::String))]);
        adjust_schema_for_simulated_capabilities(&mut schema, &activation_capabilities(true));
        // Unchanged, no panic, no error.
        assert!(!schema.get_object_class("group").unwrap().has_attribute("ds-pwp-account-disabled"));
    }

    #[test]
    fn test_no_activation_capability_is_noop() {
        let mut schema = schema_with_disable_attribute();
        let before = schema.clone();
        adjust_schema_for_simulated_capabilities(&mut schema, &CapabilitySet::new());
        assert_eq!(schema, before);
    }

    #[test]
    fn test_native_simulated_activation_applies_without_override() {
        let mut schema = schema_with_disable_attribute();
        let capabilities = CapabilitySet {
            native: vec![Capability::Activation {
                enabled: true,
                attribute: Some("ds-pwp-account-disabled".to_string()),
                ignore_attribute: true,
            }],
            configured: vec![],
            cached_at: None,
        };
        adjust_schema_for_simulated_capabilities(&mut schema, &capabilities);
        assert!(
            schema
                .get_object_class("account")
                .unwrap()
                .get_attribute("ds-pwp-account-disabled")
                .unwrap()
                .ignored
        );
    }
}
