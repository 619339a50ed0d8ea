//! Generic field tree
//!
//! A dynamically typed view of a Kubernetes object. Sanitizing and
//! re-materializing jobs works on this tree rather than on typed structs, since
//! the fields being removed may or may not exist on any given object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object tree keyed by field name, arbitrarily nested
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTree(Map<String, Value>);

/// A nested field exists but does not have the expected type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTypeError {
    pub path: String,
    pub expected: &'static str,
}

impl std::fmt::Display for FieldTypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field {} is not a {}", self.path, self.expected)
    }
}

impl std::error::Error for FieldTypeError {}

impl FieldTree {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a JSON value, returning `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the value at `path`, if every segment exists
    pub fn nested(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let mut current = self.0.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// Returns the string at `path`
    ///
    /// A missing field is `Ok(None)`; a present field of another type is an error.
    pub fn nested_string(&self, path: &[&str]) -> Result<Option<&str>, FieldTypeError> {
        match self.nested(path) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(FieldTypeError {
                path: path.join("."),
                expected: "string",
            }),
        }
    }

    /// Lenient variant of [`nested_string`](Self::nested_string)
    pub fn nested_str(&self, path: &[&str]) -> Option<&str> {
        self.nested(path).and_then(Value::as_str)
    }

    /// Removes the field at `path` and returns it
    ///
    /// Missing intermediate fields, or intermediates that are not objects,
    /// leave the tree untouched.
    pub fn remove_nested(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &mut self.0;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    /// Sets the field at `path`, creating intermediate objects as needed
    pub fn set_nested(&mut self, path: &[&str], value: Value) -> Result<(), FieldTypeError> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(());
        };
        let mut current = &mut self.0;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = entry.as_object_mut().ok_or_else(|| FieldTypeError {
                path: path[..=depth].join("."),
                expected: "object",
            })?;
        }
        current.insert(last.to_string(), value);
        Ok(())
    }

    /// Stamps `apiVersion` and `kind` at the top level
    pub fn set_type_meta(&mut self, api_version: &str, kind: &str) {
        self.0
            .insert("apiVersion".to_string(), Value::String(api_version.to_string()));
        self.0
            .insert("kind".to_string(), Value::String(kind.to_string()));
    }

    pub fn set_namespace(&mut self, namespace: &str) -> Result<(), FieldTypeError> {
        self.set_nested(
            &["metadata", "namespace"],
            Value::String(namespace.to_string()),
        )
    }

    pub fn api_version(&self) -> Option<&str> {
        self.nested_str(&["apiVersion"])
    }

    pub fn kind(&self) -> Option<&str> {
        self.nested_str(&["kind"])
    }

    pub fn name(&self) -> Option<&str> {
        self.nested_str(&["metadata", "name"])
    }

    pub fn namespace(&self) -> Option<&str> {
        self.nested_str(&["metadata", "namespace"])
    }
}

impl From<Map<String, Value>> for FieldTree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
