//! Expression evaluation
//!
//! Mapping expressions are Rhai scripts evaluated in a sandboxed engine
//! with hard resource limits. Variable bindings become scope variables;
//! the script's result converts back to JSON.

use rhai::{Dynamic, Engine, Scope};
use serde::{Deserialize, Serialize};

use crate::bindings::VariableBindings;
use crate::error::{MappingError, MappingResult};

/// Sandbox limits for expression evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionConfig {
    /// Maximum number of Rhai operations per evaluation.
    pub max_operations: u64,
    /// Fail on references to undefined variables.
    pub strict_variables: bool,
}

impl Default for ExpressionConfig {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            strict_variables: true,
        }
    }
}

/// Sandboxed evaluator for mapping expressions.
pub struct ExpressionEvaluator {
    config: ExpressionConfig,
}

impl ExpressionEvaluator {
    /// Create an evaluator with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ExpressionConfig::default())
    }

    /// Create an evaluator with custom limits.
    #[must_use]
    pub fn with_config(config: ExpressionConfig) -> Self {
        Self { config }
    }

    fn create_engine(&self) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_operations(self.config.max_operations);
        engine.set_max_call_levels(64);
        engine.set_max_string_size(65536);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(10_000);
        engine.set_strict_variables(self.config.strict_variables);

        engine.register_fn("lowercase", |s: &str| s.to_lowercase());
        engine.register_fn("uppercase", |s: &str| s.to_uppercase());
        engine.register_fn("trim", |s: &str| s.trim().to_string());
        engine.register_fn("concat2", |a: &str, b: &str| format!("{a}{b}"));
        engine.register_fn("concat3", |a: &str, b: &str, c: &str| format!("{a}{b}{c}"));

        engine
    }

    /// Check an expression for syntax errors without evaluating it.
    pub fn validate(&self, expression: &str) -> MappingResult<()> {
        // Validation cannot know the runtime bindings, so undefined
        // variables are not an error here.
        let mut engine = self.create_engine();
        engine.set_strict_variables(false);
        engine
            .compile(expression)
            .map(|_| ())
            .map_err(|e| MappingError::expression(format!("compilation error: {e}")))
    }

    /// Evaluate an expression with the given bindings in scope.
    pub fn evaluate(
        &self,
        expression: &str,
        bindings: &VariableBindings,
    ) -> MappingResult<serde_json::Value> {
        let engine = self.create_engine();

        let mut scope = Scope::new();
        for (name, value) in bindings.iter() {
            match rhai::serde::to_dynamic(value) {
                Ok(dynamic) => scope.push_dynamic(name.to_string(), dynamic),
                Err(_) => scope.push_dynamic(name.to_string(), Dynamic::UNIT),
            };
        }

        let ast = engine
            .compile_with_scope(&scope, expression)
            .map_err(|e| MappingError::expression(format!("compilation error: {e}")))?;
        let result: Dynamic = engine
            .eval_ast_with_scope(&mut scope, &ast)
            .map_err(|e| MappingError::expression(format!("runtime error: {e}")))?;

        rhai::serde::from_dynamic(&result)
            .map_err(|e| MappingError::expression(format!("conversion error: {e}")))
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Coerce an expression result to the single scalar string outbound
/// mappings produce.
pub fn to_scalar_string(value: &serde_json::Value) -> MappingResult<String> {
    match value {
        serde_json::Value::String(s) => Ok(s.clone()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(MappingError::expression(format!(
            "expression produced a non-scalar value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluate_with_bindings() {
        let evaluator = ExpressionEvaluator::new();
        let bindings = VariableBindings::new()
            .with("given_name", json!("Jack"))
            .with("sn", json!("Sparrow"));

        let result = evaluator
            .evaluate(r#"given_name + " " + sn"#, &bindings)
            .unwrap();
        assert_eq!(result, json!("Jack Sparrow"));
    }

    #[test]
    fn test_object_bindings_are_addressable() {
        let evaluator = ExpressionEvaluator::new();
        let bindings =
            VariableBindings::new().with("identity", json!({"name": {"given": "Jack"}}));

        let result = evaluator
            .evaluate(r#"uppercase(identity.name.given)"#, &bindings)
            .unwrap();
        assert_eq!(result, json!("JACK"));
    }

    #[test]
    fn test_strict_variables_reject_undefined() {
        let evaluator = ExpressionEvaluator::new();
        let err = evaluator
            .evaluate("missing_variable", &VariableBindings::new())
            .unwrap_err();
        assert!(matches!(err, MappingError::Expression { .. }));
    }

    #[test]
    fn test_operation_limit_stops_runaway_scripts() {
        let evaluator = ExpressionEvaluator::with_config(ExpressionConfig {
            max_operations: 100,
            strict_variables: true,
        });
        let err = evaluator
            .evaluate("let x = 0; while true { x += 1; }; x", &VariableBindings::new())
            .unwrap_err();
        assert!(matches!(err, MappingError::Expression { .. }));
    }

    #[test]
    fn test_validate() {
        let evaluator = ExpressionEvaluator::new();
        assert!(evaluator.validate(r#"lowercase(value)"#).is_ok());
        assert!(evaluator.validate(r#"let x = ;"#).is_err());
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(to_scalar_string(&json!("a")).unwrap(), "a");
        assert_eq!(to_scalar_string(&json!(42)).unwrap(), "42");
        assert!(to_scalar_string(&json!(["a"])).is_err());
    }
}
