//! Resource identities and desired resources.
//!
//! A resource is matched across the desired declaration and the observed
//! state purely by its [`ResourceIdentity`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub use crate::state::ActualResource;

/// Nested attribute tree of a resource.
///
/// The root is expected to be a mapping; `Null` stands for an empty tree.
pub type AttributeTree = serde_json::Value;

/// Stable key used to match desired and actual resources.
///
/// Identities order by their string form (`kind/tenant/service/name`), which
/// is the tie-breaker for every ordering the planner emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Resource kind (e.g. `Database`).
    pub kind: String,
    /// Resource name, unique per kind within a tenant and service.
    pub name: String,
    /// Owning tenant.
    pub tenant: String,
    /// Owning service.
    pub service: String,
}

/// Name and labels of a declared resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// Resource name.
    pub name: String,
    /// Free-form labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// The declared target configuration for one infrastructure object.
///
/// Immutable for the duration of a planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredResource {
    /// Identity of the resource.
    pub identity: ResourceIdentity,
    /// Name and labels.
    pub metadata: ResourceMetadata,
    /// Declared attribute tree.
    pub attributes: AttributeTree,
    /// Identities this resource references and must be created after.
    #[serde(default)]
    pub depends_on: Vec<ResourceIdentity>,
    /// Attribute paths whose values must never be displayed.
    #[serde(default)]
    pub sensitive_paths: BTreeSet<String>,
}

impl ResourceIdentity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        tenant: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            tenant: tenant.into(),
            service: service.into(),
        }
    }

    /// Returns the canonical string key of this identity.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.kind, self.tenant, self.service, self.name)
    }
}

impl Ord for ResourceIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        // Same result as comparing the display strings, without allocating.
        // Segments may contain '/', so equal strings fall back to the fields
        // to keep `Equal` consistent with `==`.
        let lhs = [&self.kind, &self.tenant, &self.service, &self.name];
        let rhs = [&other.kind, &other.tenant, &other.service, &other.name];
        let by_string = lhs
            .iter()
            .enumerate()
            .flat_map(|(i, s)| segment_bytes(i, s))
            .cmp(rhs.iter().enumerate().flat_map(|(i, s)| segment_bytes(i, s)));
        by_string.then_with(|| lhs.cmp(&rhs))
    }
}

impl PartialOrd for ResourceIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Bytes of one identity segment, prefixed by `/` after the first one.
fn segment_bytes(index: usize, segment: &str) -> impl Iterator<Item = u8> + '_ {
    let separator = if index == 0 { None } else { Some(b'/') };
    separator.into_iter().chain(segment.bytes())
}

impl FromStr for ResourceIdentity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [kind, tenant, service, name]
                if parts.iter().all(|p| !p.is_empty()) =>
            {
                Ok(Self::new(*kind, *name, *tenant, *service))
            }
            _ => Err(format!(
                "invalid resource identity '{s}', expected kind/tenant/service/name"
            )),
        }
    }
}

impl DesiredResource {
    /// Creates a desired resource with no labels, dependencies or sensitive paths.
    #[must_use]
    pub fn new(identity: ResourceIdentity, attributes: AttributeTree) -> Self {
        let metadata = ResourceMetadata {
            name: identity.name.clone(),
            labels: BTreeMap::new(),
        };
        Self {
            identity,
            metadata,
            attributes,
            depends_on: Vec::new(),
            sensitive_paths: BTreeSet::new(),
        }
    }

    /// Adds a dependency on another resource.
    #[must_use]
    pub fn depending_on(mut self, identity: ResourceIdentity) -> Self {
        self.depends_on.push(identity);
        self
    }

    /// Marks an attribute path as sensitive.
    #[must_use]
    pub fn with_sensitive(mut self, path: impl Into<String>) -> Self {
        self.sensitive_paths.insert(path.into());
        self
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.identity.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_orders_like_its_string_form() {
        let short = ResourceIdentity::new("Queue", "a", "acme", "core");
        let long = ResourceIdentity::new("Queue", "a", "acme-eu", "core");

        // '/' sorts after '-', so "Queue/acme/..." > "Queue/acme-eu/..."
        assert_eq!(short.cmp(&long), short.key().cmp(&long.key()));
        assert!(short > long);
    }

    #[test]
    fn test_identities_with_same_string_form_stay_distinct() {
        let a = ResourceIdentity::new("Queue", "jobs", "acme/eu", "core");
        let b = ResourceIdentity::new("Queue", "jobs", "acme", "eu/core");

        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());

        let set: BTreeSet<ResourceIdentity> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_identity_round_trips_through_string() {
        let id = ResourceIdentity::new("Database", "db-1", "acme", "billing");
        let parsed: ResourceIdentity = id.to_string().parse().expect("valid identity");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_identity_rejects_partial_string() {
        assert!("Database/db-1".parse::<ResourceIdentity>().is_err());
        assert!("Database//core/db-1".parse::<ResourceIdentity>().is_err());
    }
}
