//! Value filters
//!
//! Small, named transformations applied to inbound values in declared
//! order. Filters live in a [`FilterRegistry`]; a rule referencing an
//! unregistered filter is logged and skipped, but declaring filters with
//! no registry installed at all is a configuration error.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::error::{MappingError, MappingResult};
use crate::rules::FilterSpec;

/// A named value transformation.
pub trait ValueFilter: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Transform one value. `config` is the rule's filter configuration.
    fn apply(&self, value: Value, config: &Value) -> MappingResult<Value>;
}

/// Registry of available value filters.
#[derive(Default)]
pub struct FilterRegistry {
    filters: HashMap<&'static str, Arc<dyn ValueFilter>>,
}

impl FilterRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in filters installed.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TrimFilter));
        registry.register(Arc::new(LowercaseFilter));
        registry.register(Arc::new(UppercaseFilter));
        registry.register(Arc::new(RegexExtractFilter));
        registry.register(Arc::new(DefaultFilter));
        registry
    }

    /// Register a filter under its name.
    pub fn register(&mut self, filter: Arc<dyn ValueFilter>) {
        self.filters.insert(filter.name(), filter);
    }

    /// Look up a filter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ValueFilter>> {
        self.filters.get(name)
    }
}

/// Apply a filter chain to a value, strictly in declared order.
///
/// An unregistered filter is logged and skipped. Declaring filters when
/// no registry is installed is fatal.
pub fn apply_filter_chain(
    registry: Option<&FilterRegistry>,
    specs: &[FilterSpec],
    value: Value,
) -> MappingResult<Value> {
    if specs.is_empty() {
        return Ok(value);
    }
    let Some(registry) = registry else {
        return Err(MappingError::configuration(
            "mapping declares value filters but no filter registry is installed",
        ));
    };

    let mut current = value;
    for spec in specs {
        match registry.get(&spec.name) {
            Some(filter) => {
                current = filter.apply(current, &spec.config)?;
            }
            None => {
                warn!(filter = %spec.name, "unknown value filter, skipping");
            }
        }
    }
    Ok(current)
}

fn expect_string(filter: &'static str, value: &Value) -> MappingResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(MappingError::Filter {
            filter: filter.to_string(),
            message: format!("expected a scalar value, got {other}"),
        }),
    }
}

/// Trims surrounding whitespace.
struct TrimFilter;

impl ValueFilter for TrimFilter {
    fn name(&self) -> &'static str {
        "trim"
    }

    fn apply(&self, value: Value, _config: &Value) -> MappingResult<Value> {
        Ok(Value::String(
            expect_string(self.name(), &value)?.trim().to_string(),
        ))
    }
}

/// Lowercases the value.
struct LowercaseFilter;

impl ValueFilter for LowercaseFilter {
    fn name(&self) -> &'static str {
        "lowercase"
    }

    fn apply(&self, value: Value, _config: &Value) -> MappingResult<Value> {
        Ok(Value::String(
            expect_string(self.name(), &value)?.to_lowercase(),
        ))
    }
}

/// Uppercases the value.
struct UppercaseFilter;

impl ValueFilter for UppercaseFilter {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn apply(&self, value: Value, _config: &Value) -> MappingResult<Value> {
        Ok(Value::String(
            expect_string(self.name(), &value)?.to_uppercase(),
        ))
    }
}

/// Extracts the first capture group (or whole match) of a pattern.
struct RegexExtractFilter;

impl ValueFilter for RegexExtractFilter {
    fn name(&self) -> &'static str {
        "regex_extract"
    }

    fn apply(&self, value: Value, config: &Value) -> MappingResult<Value> {
        let pattern = config
            .get("pattern")
            .and_then(Value::as_str)
            .ok_or_else(|| MappingError::Filter {
                filter: self.name().to_string(),
                message: "missing 'pattern' in filter configuration".to_string(),
            })?;
        let regex = Regex::new(pattern).map_err(|e| MappingError::Filter {
            filter: self.name().to_string(),
            message: format!("invalid pattern: {e}"),
        })?;

        let input = expect_string(self.name(), &value)?;
        let Some(captures) = regex.captures(&input) else {
            return Ok(Value::String(String::new()));
        };
        let matched = captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Ok(Value::String(matched))
    }
}

/// Substitutes a configured default for null or empty values.
struct DefaultFilter;

impl ValueFilter for DefaultFilter {
    fn name(&self) -> &'static str {
        "default"
    }

    fn apply(&self, value: Value, config: &Value) -> MappingResult<Value> {
        let is_empty = match &value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if is_empty {
            Ok(config.get("value").cloned().unwrap_or(Value::Null))
        } else {
            Ok(value)
        }
    }
}
