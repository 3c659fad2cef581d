//! Desired-state hashing for change detection.
//!
//! The hash is stamped on every change set so CI can tell whether two plans
//! were computed from the same declaration.

use sha2::{Digest, Sha256};

use crate::resource::DesiredResource;

/// Hasher for computing desired-state hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of a set of desired resources.
    ///
    /// Resources are hashed in identity order, so the declaration order in
    /// the document does not matter.
    #[must_use]
    pub fn hash_desired(&self, resources: &[DesiredResource]) -> String {
        let mut sorted: Vec<&DesiredResource> = resources.iter().collect();
        sorted.sort_by(|a, b| a.identity.cmp(&b.identity));

        let mut hasher = Sha256::new();
        for resource in sorted {
            hasher.update(self.hash_resource(resource).as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single desired resource.
    #[must_use]
    pub fn hash_resource(&self, resource: &DesiredResource) -> String {
        // serde_json maps are sorted, so the canonical form is stable.
        let canonical = serde_json::to_vec(resource).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceIdentity;
    use serde_json::json;

    fn resource(name: &str, size: u32) -> DesiredResource {
        DesiredResource::new(
            ResourceIdentity::new("VM", name, "acme", "core"),
            json!({"spec": {"size": size}}),
        )
    }

    #[test]
    fn test_hash_ignores_declaration_order() {
        let hasher = ConfigHasher::new();
        let a = hasher.hash_desired(&[resource("a", 1), resource("b", 2)]);
        let b = hasher.hash_desired(&[resource("b", 2), resource("a", 1)]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_attribute_change_changes_hash() {
        let hasher = ConfigHasher::new();
        assert_ne!(
            hasher.hash_resource(&resource("a", 1)),
            hasher.hash_resource(&resource("a", 2))
        );
    }
}
