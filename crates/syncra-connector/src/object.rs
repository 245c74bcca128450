//! Object representation and deltas
//!
//! External objects are JSON trees addressed by dot-separated attribute
//! paths. A [`Modification`] is the universal delta shape used by both
//! provisioning and synchronization: an operation applied to one path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConnectorError, ConnectorResult};

/// A dot-separated path into an object tree (e.g. `activation.status`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributePath(String);

impl AttributePath {
    /// Create a path from its dot-separated string form.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The dot-separated string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The final segment of the path.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// The parent path, if this path has more than one segment.
    #[must_use]
    pub fn parent(&self) -> Option<AttributePath> {
        self.0.rfind('.').map(|i| AttributePath::new(&self.0[..i]))
    }
}

impl std::fmt::Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AttributePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AttributePath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Operation carried by a [`Modification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationOp {
    /// Add a value. On a multi-valued attribute the value is appended;
    /// missing parent containers are created.
    Add,
    /// Replace the attribute value wholesale.
    Replace,
    /// Remove the attribute.
    Delete,
}

/// A single change to one attribute path of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    /// The operation to perform.
    pub op: ModificationOp,

    /// The attribute path the operation targets.
    pub path: AttributePath,

    /// The value, absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Modification {
    /// An add of `value` at `path`.
    pub fn add(path: impl Into<AttributePath>, value: Value) -> Self {
        Self {
            op: ModificationOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    /// A wholesale replace of `path` with `value`.
    pub fn replace(path: impl Into<AttributePath>, value: Value) -> Self {
        Self {
            op: ModificationOp::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    /// A delete of `path`.
    pub fn delete(path: impl Into<AttributePath>) -> Self {
        Self {
            op: ModificationOp::Delete,
            path: path.into(),
            value: None,
        }
    }
}

/// Read the value at a dot-separated path in an object tree.
#[must_use]
pub fn get_path<'a>(object: &'a Value, path: &AttributePath) -> Option<&'a Value> {
    let mut current = object;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Apply a sequence of modifications to an object tree, in order.
///
/// `Add` creates missing parent containers and, when the path already
/// holds a value, turns it into (or extends) an array. `Replace` sets the
/// value wholesale. `Delete` removes the entry; deleting a missing path
/// is a no-op.
pub fn apply_modifications(
    object: &mut Value,
    modifications: &[Modification],
) -> ConnectorResult<()> {
    for modification in modifications {
        apply_one(object, modification)?;
    }
    Ok(())
}

fn apply_one(object: &mut Value, modification: &Modification) -> ConnectorResult<()> {
    let segments: Vec<&str> = modification.path.segments().collect();
    if segments.is_empty() || segments.iter().any(|s| s.is_empty()) {
        return Err(ConnectorError::schema(format!(
            "invalid attribute path: '{}'",
            modification.path
        )));
    }

    match modification.op {
        ModificationOp::Add => {
            let value = modification.value.clone().ok_or_else(|| {
                ConnectorError::schema(format!("add at '{}' carries no value", modification.path))
            })?;
            let parent = descend_or_create(object, &segments[..segments.len() - 1], &modification.path)?;
            let leaf = segments[segments.len() - 1];
            match parent.get_mut(leaf) {
                None | Some(Value::Null) => {
                    parent.insert(leaf.to_string(), value);
                }
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let previous = existing.take();
                    *existing = Value::Array(vec![previous, value]);
                }
            }
        }
        ModificationOp::Replace => {
            let value = modification.value.clone().ok_or_else(|| {
                ConnectorError::schema(format!(
                    "replace at '{}' carries no value",
                    modification.path
                ))
            })?;
            let parent = descend_or_create(object, &segments[..segments.len() - 1], &modification.path)?;
            parent.insert(segments[segments.len() - 1].to_string(), value);
        }
        ModificationOp::Delete => {
            if let Some(parent) = descend(object, &segments[..segments.len() - 1]) {
                parent.remove(segments[segments.len() - 1]);
            }
        }
    }
    Ok(())
}

fn descend<'a>(
    object: &'a mut Value,
    segments: &[&str],
) -> Option<&'a mut serde_json::Map<String, Value>> {
    let mut current = object;
    for segment in segments {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    current.as_object_mut()
}

fn descend_or_create<'a>(
    object: &'a mut Value,
    segments: &[&str],
    path: &AttributePath,
) -> ConnectorResult<&'a mut serde_json::Map<String, Value>> {
    let mut current = object;
    for segment in segments {
        let map = current.as_object_mut().ok_or_else(|| {
            ConnectorError::schema(format!(
                "path '{path}' traverses a non-object value at '{segment}'"
            ))
        })?;
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    current.as_object_mut().ok_or_else(|| {
        ConnectorError::schema(format!("path '{path}' ends inside a non-object value"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_segments() {
        let path = AttributePath::new("activation.status");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["activation", "status"]);
        assert_eq!(path.last_segment(), "status");
        assert_eq!(path.parent(), Some(AttributePath::new("activation")));
        assert_eq!(AttributePath::new("cn").parent(), None);
    }

    #[test]
    fn test_get_path() {
        let object = json!({"name": {"given": "Jack"}, "uid": "jsparrow"});
        assert_eq!(
            get_path(&object, &"name.given".into()),
            Some(&json!("Jack"))
        );
        assert_eq!(get_path(&object, &"uid".into()), Some(&json!("jsparrow")));
        assert_eq!(get_path(&object, &"name.family".into()), None);
        assert_eq!(get_path(&object, &"uid.sub".into()), None);
    }

    #[test]
    fn test_add_creates_parents() {
        let mut object = json!({});
        apply_modifications(
            &mut object,
            &[Modification::add("activation.status", json!("enabled"))],
        )
        .unwrap();
        assert_eq!(object, json!({"activation": {"status": "enabled"}}));
    }

    #[test]
    fn test_add_appends_to_existing() {
        let mut object = json!({"mail": "a@example.com"});
        apply_modifications(&mut object, &[Modification::add("mail", json!("b@example.com"))])
            .unwrap();
        assert_eq!(object["mail"], json!(["a@example.com", "b@example.com"]));

        apply_modifications(&mut object, &[Modification::add("mail", json!("c@example.com"))])
            .unwrap();
        assert_eq!(
            object["mail"],
            json!(["a@example.com", "b@example.com", "c@example.com"])
        );
    }

    #[test]
    fn test_replace_sets_wholesale() {
        let mut object = json!({"mail": ["a@example.com", "b@example.com"]});
        apply_modifications(
            &mut object,
            &[Modification::replace("mail", json!("c@example.com"))],
        )
        .unwrap();
        assert_eq!(object["mail"], json!("c@example.com"));
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let mut object = json!({"uid": "jsparrow"});
        apply_modifications(&mut object, &[Modification::delete("name.given")]).unwrap();
        assert_eq!(object, json!({"uid": "jsparrow"}));
    }

    #[test]
    fn test_delete_removes_entry() {
        let mut object = json!({"uid": "jsparrow", "cn": "Jack Sparrow"});
        apply_modifications(&mut object, &[Modification::delete("cn")]).unwrap();
        assert_eq!(object, json!({"uid": "jsparrow"}));
    }

    #[test]
    fn test_add_through_scalar_fails() {
        let mut object = json!({"uid": "jsparrow"});
        let err = apply_modifications(
            &mut object,
            &[Modification::add("uid.sub", json!("x"))],
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-object"));
    }
}
