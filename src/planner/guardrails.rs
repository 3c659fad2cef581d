//! Guardrails for CI gating.
//!
//! Guardrails never change a plan. They inspect a finished change set and
//! report every rule it breaks, leaving the decision to the caller.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::resource::ResourceIdentity;

use super::plan::{ChangeSet, ChangeType};

/// Limits on destructive changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardrails {
    /// Maximum number of deletes in one plan.
    #[serde(default)]
    pub max_deletes: Option<usize>,
    /// Maximum number of recreates in one plan.
    #[serde(default)]
    pub max_recreates: Option<usize>,
    /// Kinds that may never be deleted or recreated.
    #[serde(default)]
    pub protected_kinds: BTreeSet<String>,
}

/// A broken guardrail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Violation {
    /// More deletes than allowed.
    TooManyDeletes {
        /// Deletes in the plan.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// More recreates than allowed.
    TooManyRecreates {
        /// Recreates in the plan.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },
    /// A protected kind would be destroyed.
    ProtectedKind {
        /// Resource that would be destroyed.
        identity: ResourceIdentity,
        /// Delete or recreate.
        change_type: ChangeType,
    },
}

impl Guardrails {
    /// Returns true if no rule is configured.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.max_deletes.is_none() && self.max_recreates.is_none() && self.protected_kinds.is_empty()
    }

    /// Checks a change set, returning violations in a stable order: count
    /// limits first, then protected kinds in execution order.
    #[must_use]
    pub fn check(&self, change_set: &ChangeSet) -> Vec<Violation> {
        let summary = change_set.summary();
        let mut violations = Vec::new();

        if let Some(limit) = self.max_deletes {
            if summary.delete > limit {
                violations.push(Violation::TooManyDeletes {
                    count: summary.delete,
                    limit,
                });
            }
        }

        if let Some(limit) = self.max_recreates {
            if summary.recreate > limit {
                violations.push(Violation::TooManyRecreates {
                    count: summary.recreate,
                    limit,
                });
            }
        }

        for change in change_set.changes() {
            let destructive = matches!(change.change_type, ChangeType::Delete | ChangeType::Recreate);
            if destructive && self.protected_kinds.contains(&change.resource_kind) {
                violations.push(Violation::ProtectedKind {
                    identity: change.identity.clone(),
                    change_type: change.change_type,
                });
            }
        }

        violations
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyDeletes { count, limit } => {
                write!(f, "plan deletes {count} resource(s), limit is {limit}")
            }
            Self::TooManyRecreates { count, limit } => {
                write!(f, "plan recreates {count} resource(s), limit is {limit}")
            }
            Self::ProtectedKind { identity, change_type } => {
                write!(f, "{identity} is a protected kind and cannot be {change_type}d")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan::{Change, StackRef};

    fn change(kind: &str, name: &str, change_type: ChangeType) -> Change {
        Change {
            identity: ResourceIdentity::new(kind, name, "acme", "core"),
            resource_id: String::new(),
            resource_kind: kind.to_string(),
            resource_name: name.to_string(),
            change_type,
            attribute_changes: vec![],
            reason: String::from("test"),
            requires_recreate: change_type == ChangeType::Recreate,
            depends_on: vec![],
        }
    }

    fn change_set() -> ChangeSet {
        ChangeSet::new(
            StackRef::default(),
            "h",
            vec![
                change("Queue", "q-1", ChangeType::Update),
                change("Database", "db-1", ChangeType::Recreate),
                change("Queue", "q-2", ChangeType::Delete),
                change("Bucket", "b-1", ChangeType::Delete),
            ],
            0,
        )
    }

    #[test]
    fn test_default_is_unrestricted() {
        let guardrails = Guardrails::default();
        assert!(guardrails.is_unrestricted());
        assert!(guardrails.check(&change_set()).is_empty());
    }

    #[test]
    fn test_count_limits() {
        let guardrails = Guardrails {
            max_deletes: Some(1),
            max_recreates: Some(1),
            ..Guardrails::default()
        };

        let violations = guardrails.check(&change_set());
        assert_eq!(violations, vec![Violation::TooManyDeletes { count: 2, limit: 1 }]);
        assert_eq!(violations[0].to_string(), "plan deletes 2 resource(s), limit is 1");
    }

    #[test]
    fn test_protected_kinds() {
        let guardrails = Guardrails {
            protected_kinds: ["Database", "Queue"].into_iter().map(String::from).collect(),
            ..Guardrails::default()
        };

        let violations = guardrails.check(&change_set());
        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].to_string(),
            "Database/acme/core/db-1 is a protected kind and cannot be recreated"
        );
        assert_eq!(
            violations[1].to_string(),
            "Queue/acme/core/q-2 is a protected kind and cannot be deleted"
        );
    }

    #[test]
    fn test_violation_serializes_with_rule_tag() {
        let value = serde_json::to_value(Violation::TooManyRecreates { count: 3, limit: 0 })
            .expect("serializable");
        assert_eq!(value["rule"], "too_many_recreates");
        assert_eq!(value["count"], 3);
    }
}
