//! Per-kind provider capabilities.
//!
//! The comparator never branches on resource kinds. Everything it needs to
//! know about a kind comes from the [`ResourceCapability`] registered for it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::resource::AttributeTree;

use super::path::{self, PathSet};
use super::policy::RecreatePolicy;

/// What the planner needs to know about one resource kind.
pub trait ResourceCapability: fmt::Debug + Send + Sync {
    /// Kind identifier, as used in resource identities.
    fn kind(&self) -> &str;

    /// Human-readable label for the kind.
    fn label(&self) -> &str;

    /// Attribute paths that cannot be changed in place.
    fn recreate_policy(&self) -> &RecreatePolicy;

    /// Attribute paths whose values are always sensitive for this kind.
    fn sensitive_paths(&self) -> &PathSet;

    /// Whether the kind carries a `tags` attribute managed by stackplan.
    fn taggable(&self) -> bool {
        false
    }

    /// Checks that an attribute tree has a shape this kind can accept.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the tree is malformed.
    fn validate_attributes(&self, attributes: &AttributeTree) -> Result<(), String> {
        check_root(attributes)
    }
}

/// Checks that the root of a tree is a mapping (or absent).
///
/// # Errors
///
/// Returns a description naming the actual root type.
pub fn check_root(attributes: &AttributeTree) -> Result<(), String> {
    match attributes {
        AttributeTree::Object(_) | AttributeTree::Null => Ok(()),
        other => Err(format!("root must be a mapping, found {}", json_type(other))),
    }
}

const fn json_type(value: &AttributeTree) -> &'static str {
    match value {
        AttributeTree::Null => "null",
        AttributeTree::Bool(_) => "boolean",
        AttributeTree::Number(_) => "number",
        AttributeTree::String(_) => "string",
        AttributeTree::Array(_) => "sequence",
        AttributeTree::Object(_) => "mapping",
    }
}

/// Declarative description of a kind, as written in the stack document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSpec {
    /// Kind identifier.
    pub kind: String,
    /// Human-readable label (defaults to the kind).
    #[serde(default)]
    pub label: Option<String>,
    /// Immutable attribute path patterns.
    #[serde(default)]
    pub immutable: Vec<String>,
    /// Sensitive attribute path patterns.
    #[serde(default)]
    pub sensitive: Vec<String>,
    /// Attribute paths that must be present in every declaration.
    #[serde(default)]
    pub required: Vec<String>,
    /// Whether stackplan manages a `tags` attribute for this kind.
    #[serde(default)]
    pub taggable: bool,
}

/// Capability backed by static tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCapability {
    kind: String,
    label: String,
    policy: RecreatePolicy,
    sensitive: PathSet,
    required: Vec<String>,
    taggable: bool,
}

impl StaticCapability {
    /// Creates a capability with no immutable or sensitive paths.
    #[must_use]
    pub fn new(kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            label: label.into(),
            policy: RecreatePolicy::none(),
            sensitive: PathSet::new(),
            required: Vec::new(),
            taggable: false,
        }
    }

    /// Sets the immutable path patterns.
    #[must_use]
    pub fn with_immutable<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.policy = RecreatePolicy::new(paths);
        self
    }

    /// Sets the sensitive path patterns.
    #[must_use]
    pub fn with_sensitive<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.sensitive = paths.into_iter().collect();
        self
    }

    /// Sets the attribute paths every declaration must carry.
    #[must_use]
    pub fn with_required<S: Into<String>>(mut self, paths: impl IntoIterator<Item = S>) -> Self {
        self.required = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the kind as taggable.
    #[must_use]
    pub const fn with_tags(mut self) -> Self {
        self.taggable = true;
        self
    }
}

impl From<KindSpec> for StaticCapability {
    fn from(spec: KindSpec) -> Self {
        let label = spec.label.unwrap_or_else(|| spec.kind.clone());
        let mut capability = Self::new(spec.kind, label)
            .with_immutable(spec.immutable)
            .with_sensitive(spec.sensitive)
            .with_required(spec.required);
        capability.taggable = spec.taggable;
        capability
    }
}

impl ResourceCapability for StaticCapability {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn recreate_policy(&self) -> &RecreatePolicy {
        &self.policy
    }

    fn sensitive_paths(&self) -> &PathSet {
        &self.sensitive
    }

    fn taggable(&self) -> bool {
        self.taggable
    }

    fn validate_attributes(&self, attributes: &AttributeTree) -> Result<(), String> {
        check_root(attributes)?;
        for required in &self.required {
            let segments = path::parse(required)?;
            if path::lookup(attributes, &segments).is_none() {
                return Err(format!("required attribute '{required}' is missing"));
            }
        }
        Ok(())
    }
}
