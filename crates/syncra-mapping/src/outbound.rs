//! Outbound evaluation
//!
//! Identity-to-resource mapping: each rule computes one scalar string and
//! lands it at `attributes.<name>` in the resource-native tree as a
//! replace (attribute present) or an add (attribute absent). Rule
//! failures isolate into per-attribute issues; only structural problems
//! propagate.

use serde_json::Value;
use tracing::{debug, warn};

use syncra_connector::{get_path, AttributePath, Modification, Schema};

use crate::bindings::{ObjectResolver, VariableBindings};
use crate::engine::{attribute_is_ignored, MappingIssue, MappingOutcome};
use crate::error::{MappingError, MappingResult};
use crate::expression::{to_scalar_string, ExpressionEvaluator};
use crate::rules::{AttributeMapping, OutboundRule};

pub(crate) async fn evaluate(
    evaluator: &ExpressionEvaluator,
    resolver: Option<&dyn ObjectResolver>,
    schema: Option<&Schema>,
    mappings: &[AttributeMapping],
    base_bindings: &VariableBindings,
    resource_native: &Value,
) -> MappingResult<MappingOutcome> {
    let mut outcome = MappingOutcome::default();

    for mapping in mappings {
        let Some(rule) = &mapping.outbound else {
            continue;
        };
        if attribute_is_ignored(schema, &mapping.attribute) {
            warn!(
                attribute = %mapping.attribute,
                "attribute is ignored by capability negotiation, skipping outbound rule"
            );
            continue;
        }

        match evaluate_rule(
            evaluator,
            resolver,
            rule,
            &mapping.attribute,
            base_bindings,
            resource_native,
        )
        .await
        {
            Ok(Some(modification)) => {
                // One scalar per attribute: a later rule for the same
                // path wins over an earlier one.
                outcome
                    .modifications
                    .retain(|m| m.path != modification.path);
                outcome.modifications.push(modification);
            }
            Ok(None) => {}
            Err(err @ MappingError::Schema { .. }) => return Err(err),
            Err(err) => {
                warn!(attribute = %mapping.attribute, error = %err, "outbound rule failed");
                outcome.issues.push(MappingIssue {
                    attribute: mapping.attribute.clone(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(outcome)
}

async fn evaluate_rule(
    evaluator: &ExpressionEvaluator,
    resolver: Option<&dyn ObjectResolver>,
    rule: &OutboundRule,
    attribute: &str,
    base_bindings: &VariableBindings,
    resource_native: &Value,
) -> MappingResult<Option<Modification>> {
    // The applicability check walks the target object; anything other
    // than an object tree here is a structural error.
    if !resource_native.is_object() {
        return Err(MappingError::schema(format!(
            "outbound target for '{attribute}' is not an object tree"
        )));
    }

    let path = AttributePath::new(format!("attributes.{attribute}"));
    let existing = get_path(resource_native, &path);

    if rule.default_only && existing.is_some() {
        debug!(attribute, "target already has a value, default-only rule does not apply");
        return Ok(None);
    }

    let bindings = base_bindings.for_rule(&rule.variables, resolver).await;

    let value = if let Some(expression) = &rule.expression {
        let result = evaluator.evaluate(expression, &bindings)?;
        to_scalar_string(&result)?
    } else if !rule.literal.is_empty() {
        rule.literal.concat()
    } else {
        warn!(attribute, "outbound rule has neither expression nor literal, skipping");
        return Ok(None);
    };

    let value = Value::String(value);
    Ok(Some(if existing.is_some() {
        Modification::replace(path, value)
    } else {
        Modification::add(path, value)
    }))
}
