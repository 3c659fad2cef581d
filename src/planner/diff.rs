//! Structural diff of attribute trees.
//!
//! This module compares the observed attribute tree of a resource with its
//! declared tree and reports every leaf path whose value differs.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::provider::path::{child_index, child_key};
use crate::provider::PathSet;

/// Placeholder shown instead of sensitive values.
pub const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// A single attribute-level difference.
///
/// At least one of `old_value` and `new_value` is set. `Debug`, `Display`
/// and `Serialize` never expose values of sensitive changes.
#[derive(Clone, PartialEq)]
pub struct AttributeChange {
    /// Path of the attribute (`spec.ports[0].port`).
    pub path: String,
    /// Observed value, `None` when the attribute is being added.
    pub old_value: Option<Value>,
    /// Declared value, `None` when the attribute is being removed.
    pub new_value: Option<Value>,
    /// Whether the values must be masked in any output.
    pub sensitive: bool,
    /// Whether this change cannot be applied in place.
    pub force_recreate: bool,
}

/// Computes attribute-level differences between two trees.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDiffer<'a> {
    /// Sensitive path patterns.
    sensitive: &'a PathSet,
}

impl<'a> AttributeDiffer<'a> {
    /// Creates a differ that flags changes under the given sensitive paths.
    #[must_use]
    pub const fn new(sensitive: &'a PathSet) -> Self {
        Self { sensitive }
    }

    /// Compares two attribute trees.
    ///
    /// Either side may be absent. The result is sorted by path and contains
    /// no entry for attributes whose values are equal.
    #[must_use]
    pub fn diff(&self, old: Option<&Value>, new: Option<&Value>) -> Vec<AttributeChange> {
        let mut changes = Vec::new();
        self.walk("", root(old), root(new), &mut changes);
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        changes
    }

    fn walk(
        &self,
        path: &str,
        old: Option<&Value>,
        new: Option<&Value>,
        out: &mut Vec<AttributeChange>,
    ) {
        match (old, new) {
            (None, None) => {}
            (Some(a), Some(b)) if a == b => {}
            (Some(Value::Object(a)), Some(Value::Object(b))) => {
                let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
                for key in keys {
                    self.walk(&child_key(path, key), a.get(key), b.get(key), out);
                }
            }
            (Some(Value::Array(a)), Some(Value::Array(b))) => {
                for index in 0..a.len().max(b.len()) {
                    self.walk(&child_index(path, index), a.get(index), b.get(index), out);
                }
            }
            // One side is absent: descend into the present container so
            // every added or removed leaf gets its own path.
            (Some(Value::Object(a)), None) if !a.is_empty() => {
                for (key, value) in a {
                    self.walk(&child_key(path, key), Some(value), None, out);
                }
            }
            (None, Some(Value::Object(b))) if !b.is_empty() => {
                for (key, value) in b {
                    self.walk(&child_key(path, key), None, Some(value), out);
                }
            }
            (Some(Value::Array(a)), None) if !a.is_empty() => {
                for (index, value) in a.iter().enumerate() {
                    self.walk(&child_index(path, index), Some(value), None, out);
                }
            }
            (None, Some(Value::Array(b))) if !b.is_empty() => {
                for (index, value) in b.iter().enumerate() {
                    self.walk(&child_index(path, index), None, Some(value), out);
                }
            }
            (old, new) => out.push(AttributeChange {
                path: path.to_string(),
                old_value: old.cloned(),
                new_value: new.cloned(),
                sensitive: self.sensitive.touches(path),
                force_recreate: false,
            }),
        }
    }
}

/// An absent tree and a null root both mean "no attributes".
fn root(tree: Option<&Value>) -> Option<&Value> {
    tree.filter(|value| !value.is_null())
}

impl AttributeChange {
    /// Returns true if the attribute is being added.
    #[must_use]
    pub const fn is_addition(&self) -> bool {
        self.old_value.is_none()
    }

    /// Returns true if the attribute is being removed.
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        self.new_value.is_none()
    }

    /// Old value for display, masked when sensitive.
    #[must_use]
    pub fn display_old(&self) -> Option<String> {
        self.masked(self.old_value.as_ref())
    }

    /// New value for display, masked when sensitive.
    #[must_use]
    pub fn display_new(&self) -> Option<String> {
        self.masked(self.new_value.as_ref())
    }

    fn masked(&self, value: Option<&Value>) -> Option<String> {
        value.map(|v| {
            if self.sensitive {
                String::from(SENSITIVE_PLACEHOLDER)
            } else {
                v.to_string()
            }
        })
    }
}

impl fmt::Debug for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeChange")
            .field("path", &self.path)
            .field("old_value", &self.display_old())
            .field("new_value", &self.display_new())
            .field("sensitive", &self.sensitive)
            .field("force_recreate", &self.force_recreate)
            .finish()
    }
}

impl fmt::Display for AttributeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old = self.display_old().unwrap_or_else(|| String::from("(none)"));
        let new = self.display_new().unwrap_or_else(|| String::from("(none)"));
        write!(f, "{}: {old} -> {new}", self.path)?;
        if self.force_recreate {
            write!(f, " (forces replacement)")?;
        }
        Ok(())
    }
}

impl Serialize for AttributeChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("AttributeChange", 5)?;
        record.serialize_field("path", &self.path)?;
        if self.sensitive {
            record.skip_field("old_value")?;
            record.skip_field("new_value")?;
        } else {
            record.serialize_field("old_value", &self.old_value)?;
            record.serialize_field("new_value", &self.new_value)?;
        }
        record.serialize_field("sensitive", &self.sensitive)?;
        record.serialize_field("force_recreate", &self.force_recreate)?;
        record.end()
    }
}
