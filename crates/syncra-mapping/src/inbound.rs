//! Inbound evaluation
//!
//! Resource-to-identity mapping: every inbound rule of every attribute is
//! evaluated independently. Source values pass through the rule's filter
//! chain and land at the rule's target path in the identity tree: added
//! (with parents synthesized) when the path is empty, replaced wholesale
//! when it already holds a value. Tolerant rules append instead of
//! replacing.

use serde_json::Value;
use tracing::{debug, warn};

use syncra_connector::{get_path, AttributePath, Modification, Schema};

use crate::engine::{attribute_is_ignored, MappingIssue, MappingOutcome};
use crate::error::{MappingError, MappingResult};
use crate::filters::{apply_filter_chain, FilterRegistry};
use crate::rules::{AttributeMapping, InboundRule};

pub(crate) fn evaluate(
    registry: Option<&FilterRegistry>,
    schema: Option<&Schema>,
    mappings: &[AttributeMapping],
    resource_native: &Value,
    identity: &Value,
) -> MappingResult<MappingOutcome> {
    if !identity.is_object() {
        return Err(MappingError::schema(
            "inbound target identity is not an object tree",
        ));
    }

    let mut outcome = MappingOutcome::default();

    for mapping in mappings {
        if attribute_is_ignored(schema, &mapping.attribute) {
            debug!(
                attribute = %mapping.attribute,
                "attribute is ignored by capability negotiation, skipping inbound rules"
            );
            continue;
        }
        for rule in &mapping.inbound {
            match evaluate_rule(registry, mapping, rule, resource_native, identity) {
                Ok(modifications) => outcome.modifications.extend(modifications),
                // Structural and setup problems stop the evaluation.
                Err(err @ (MappingError::Schema { .. } | MappingError::Configuration { .. })) => {
                    return Err(err)
                }
                Err(err) => {
                    warn!(attribute = %mapping.attribute, error = %err, "inbound rule failed");
                    outcome.issues.push(MappingIssue {
                        attribute: mapping.attribute.clone(),
                        kind: err.kind(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    Ok(outcome)
}

fn evaluate_rule(
    registry: Option<&FilterRegistry>,
    mapping: &AttributeMapping,
    rule: &InboundRule,
    resource_native: &Value,
    identity: &Value,
) -> MappingResult<Vec<Modification>> {
    if rule.target.segments().any(str::is_empty) {
        return Err(MappingError::schema(format!(
            "malformed inbound target path '{}'",
            rule.target
        )));
    }

    let source_path = AttributePath::new(format!("attributes.{}", mapping.attribute));
    let source_values = match get_path(resource_native, &source_path) {
        None | Some(Value::Null) => {
            debug!(attribute = %mapping.attribute, "source attribute absent, nothing to map");
            return Ok(Vec::new());
        }
        Some(Value::Array(items)) => items.clone(),
        Some(value) => vec![value.clone()],
    };

    let mut transformed = Vec::with_capacity(source_values.len());
    for value in source_values {
        transformed.push(apply_filter_chain(registry, &rule.filters, value)?);
    }

    let existing = get_path(identity, &rule.target);
    if existing.is_some() && !rule.tolerant {
        // Overwrite, never merge.
        let replacement = if transformed.len() == 1 {
            transformed.into_iter().next().unwrap_or(Value::Null)
        } else {
            Value::Array(transformed)
        };
        return Ok(vec![Modification::replace(rule.target.clone(), replacement)]);
    }

    // Absent target, or a tolerant rule: insert as new children, parents
    // synthesized on apply.
    Ok(transformed
        .into_iter()
        .map(|value| Modification::add(rule.target.clone(), value))
        .collect())
}
