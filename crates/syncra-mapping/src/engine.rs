//! Mapping engine
//!
//! The caller-facing entry point for evaluating mapping rules against a
//! complete resource definition. Both directions share the same variable
//! binding and filter machinery; both return modifications plus the
//! per-rule failures that were isolated along the way.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::instrument;

use syncra_connector::{ErrorKind, Modification, Schema};
use syncra_resource::ResourceDefinition;

use crate::bindings::{ObjectResolver, VariableBindings};
use crate::error::MappingResult;
use crate::expression::{ExpressionConfig, ExpressionEvaluator};
use crate::filters::FilterRegistry;
use crate::rules::AttributeMapping;
use crate::{inbound, outbound};

/// A per-rule failure that did not stop sibling rules.
#[derive(Debug, Clone)]
pub struct MappingIssue {
    /// The resource attribute whose rule failed.
    pub attribute: String,
    /// Classified failure kind.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// The result of evaluating one direction of a resource's mappings.
#[derive(Debug, Default)]
pub struct MappingOutcome {
    /// Modifications to apply to the target tree, in evaluation order.
    pub modifications: Vec<Modification>,
    /// Rule failures that were isolated.
    pub issues: Vec<MappingIssue>,
}

impl MappingOutcome {
    /// Whether every rule evaluated cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Evaluates attribute mapping rules for complete resources.
pub struct MappingEngine {
    evaluator: ExpressionEvaluator,
    filters: Option<FilterRegistry>,
    resolver: Option<Arc<dyn ObjectResolver>>,
}

impl MappingEngine {
    /// An engine with the built-in filters and default expression limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            evaluator: ExpressionEvaluator::new(),
            filters: Some(FilterRegistry::with_builtins()),
            resolver: None,
        }
    }

    /// Override the expression sandbox limits.
    #[must_use]
    pub fn with_expression_config(mut self, config: ExpressionConfig) -> Self {
        self.evaluator = ExpressionEvaluator::with_config(config);
        self
    }

    /// Replace the filter registry. Passing `None` removes filter support
    /// entirely; rules that declare filters then fail fatally.
    #[must_use]
    pub fn with_filters(mut self, filters: Option<FilterRegistry>) -> Self {
        self.filters = filters;
        self
    }

    /// Install an object resolver for variable dereference.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ObjectResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Evaluate the outbound (identity to resource) rules, producing
    /// modifications against the resource-native tree.
    #[instrument(skip_all, fields(resource = %resource.name))]
    pub async fn evaluate_outbound(
        &self,
        resource: &ResourceDefinition,
        mappings: &[AttributeMapping],
        identity: &Value,
        resource_native: &Value,
    ) -> MappingResult<MappingOutcome> {
        let bindings = self.base_bindings(resource, identity, resource_native);
        outbound::evaluate(
            &self.evaluator,
            self.resolver.as_deref(),
            resource.schema.as_ref(),
            mappings,
            &bindings,
            resource_native,
        )
        .await
    }

    /// Evaluate the inbound (resource to identity) rules, producing
    /// modifications against the identity tree.
    #[instrument(skip_all, fields(resource = %resource.name))]
    pub fn evaluate_inbound(
        &self,
        resource: &ResourceDefinition,
        mappings: &[AttributeMapping],
        resource_native: &Value,
        identity: &Value,
    ) -> MappingResult<MappingOutcome> {
        inbound::evaluate(
            self.filters.as_ref(),
            resource.schema.as_ref(),
            mappings,
            resource_native,
            identity,
        )
    }

    fn base_bindings(
        &self,
        resource: &ResourceDefinition,
        identity: &Value,
        resource_native: &Value,
    ) -> VariableBindings {
        VariableBindings::new()
            .with("identity", identity.clone())
            .with("account", resource_native.clone())
            .with(
                "resource",
                json!({"id": resource.id.to_string(), "name": resource.name}),
            )
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn attribute_is_ignored(schema: Option<&Schema>, attribute: &str) -> bool {
    schema.is_some_and(|schema| {
        schema
            .object_classes
            .iter()
            .filter_map(|class| class.get_attribute(attribute))
            .any(|definition| definition.ignored)
    })
}
