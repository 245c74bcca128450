//! Variable bindings
//!
//! Each rule evaluation gets a fresh binding scope: the well-known base
//! bindings (identity, account, resource) plus the rule's own declared
//! variables. A rule's variables never leak into sibling rules.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::error::MappingResult;
use crate::rules::VariableDeclaration;

/// Dereferences object references declared by mapping variables.
#[async_trait]
pub trait ObjectResolver: Send + Sync {
    /// Fetch an object by kind and id.
    async fn get_object(&self, kind: &str, id: &str) -> MappingResult<Value>;
}

/// A named set of values visible to one expression evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableBindings {
    values: BTreeMap<String, Value>,
}

impl VariableBindings {
    /// Create an empty binding set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value, replacing any previous binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`bind`](Self::bind).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind(name, value);
        self
    }

    /// Look up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Iterate over all bindings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build a fresh scope for one rule: this set's bindings plus the
    /// rule's declarations. An unresolvable declaration is logged and
    /// left unbound rather than failing the rule.
    pub async fn for_rule(
        &self,
        declarations: &[VariableDeclaration],
        resolver: Option<&dyn ObjectResolver>,
    ) -> VariableBindings {
        let mut scope = self.clone();
        for declaration in declarations {
            if let Some(value) = &declaration.value {
                scope.bind(&declaration.name, value.clone());
                continue;
            }
            let Some(object_ref) = &declaration.object_ref else {
                warn!(variable = %declaration.name, "variable declares neither value nor reference");
                continue;
            };
            let Some(resolver) = resolver else {
                warn!(
                    variable = %declaration.name,
                    "no object resolver available, leaving variable unbound"
                );
                continue;
            };
            match resolver.get_object(&object_ref.kind, &object_ref.id).await {
                Ok(value) => scope.bind(&declaration.name, value),
                Err(err) => {
                    warn!(
                        variable = %declaration.name,
                        kind = %object_ref.kind,
                        id = %object_ref.id,
                        error = %err,
                        "failed to resolve variable, leaving it unbound"
                    );
                }
            }
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MappingError;
    use serde_json::json;

    struct StaticResolver;

    #[async_trait]
    impl ObjectResolver for StaticResolver {
        async fn get_object(&self, kind: &str, id: &str) -> MappingResult<Value> {
            if kind == "org" && id == "eng" {
                Ok(json!({"name": "Engineering"}))
            } else {
                Err(MappingError::UnresolvedVariable {
                    name: id.to_string(),
                    message: "no such object".to_string(),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_rule_scope_extends_base() {
        let base = VariableBindings::new().with("identity", json!({"uid": "jsparrow"}));
        let declarations = vec![
            VariableDeclaration::literal("domain", json!("example.com")),
            VariableDeclaration::reference("org", "org", "eng"),
        ];

        let scope = base.for_rule(&declarations, Some(&StaticResolver)).await;
        assert_eq!(scope.get("identity"), Some(&json!({"uid": "jsparrow"})));
        assert_eq!(scope.get("domain"), Some(&json!("example.com")));
        assert_eq!(scope.get("org"), Some(&json!({"name": "Engineering"})));
        // The base set is untouched.
        assert_eq!(base.len(), 1);
    }

    #[tokio::test]
    async fn test_unresolvable_variable_is_skipped() {
        let base = VariableBindings::new();
        let declarations = vec![VariableDeclaration::reference("org", "org", "missing")];

        let scope = base.for_rule(&declarations, Some(&StaticResolver)).await;
        assert!(scope.get("org").is_none());
    }

    #[tokio::test]
    async fn test_sibling_rules_do_not_share_variables() {
        let base = VariableBindings::new().with("identity", json!({}));

        let first = base
            .for_rule(
                &[VariableDeclaration::literal("x", json!(1))],
                None,
            )
            .await;
        let second = base.for_rule(&[], None).await;

        assert!(first.get("x").is_some());
        assert!(second.get("x").is_none());
    }
}
