//! Recreate policy: which attribute changes force destroy-then-create.

use serde::{Deserialize, Serialize};

use super::path::PathSet;

/// Immutable attribute paths of one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecreatePolicy {
    immutable: PathSet,
}

/// Outcome of evaluating a policy against a set of changed paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecreateDecision {
    /// Changed paths that cannot be updated in place, in input order.
    pub triggers: Vec<String>,
}

impl RecreatePolicy {
    /// Creates a policy from immutable path patterns.
    #[must_use]
    pub fn new<S: Into<String>>(immutable: impl IntoIterator<Item = S>) -> Self {
        Self {
            immutable: immutable.into_iter().collect(),
        }
    }

    /// A policy that never forces recreation.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            immutable: PathSet::new(),
        }
    }

    /// Returns the immutable path patterns.
    #[must_use]
    pub const fn immutable_paths(&self) -> &PathSet {
        &self.immutable
    }

    /// Returns true if a change at `path` cannot be applied in place.
    #[must_use]
    pub fn forces_recreate(&self, path: &str) -> bool {
        self.immutable.touches(path)
    }

    /// Evaluates a set of changed paths.
    #[must_use]
    pub fn evaluate<'a>(&self, changed: impl IntoIterator<Item = &'a str>) -> RecreateDecision {
        RecreateDecision {
            triggers: changed
                .into_iter()
                .filter(|path| self.forces_recreate(path))
                .map(String::from)
                .collect(),
        }
    }
}

impl RecreateDecision {
    /// Returns true if any changed path forces recreation.
    #[must_use]
    pub fn is_forced(&self) -> bool {
        !self.triggers.is_empty()
    }
}
