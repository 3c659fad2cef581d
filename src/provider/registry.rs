//! Registry of provider capabilities, keyed by resource kind.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::capability::{KindSpec, ResourceCapability, StaticCapability};
use super::policy::RecreateDecision;

/// Built-in kinds: (kind, label, immutable paths, sensitive paths).
const BUILTIN_KINDS: &[(&str, &str, &[&str], &[&str])] = &[
    ("Bucket", "Object storage bucket", &["spec.region", "spec.bucketName"], &[]),
    ("Cache", "In-memory cache cluster", &["spec.engine", "spec.subnetGroup"], &["spec.authToken"]),
    (
        "Database",
        "Managed database",
        &["spec.engine", "spec.storageEncrypted", "spec.availabilityZone"],
        &["spec.masterPassword"],
    ),
    ("Network", "Virtual network", &["spec.cidrBlock"], &[]),
    ("Queue", "Message queue", &["spec.fifo", "spec.queueName"], &[]),
    ("SecurityGroup", "Security group", &["spec.vpcId", "spec.groupName"], &[]),
    ("VM", "Virtual machine", &["spec.vpcId", "spec.imageId", "spec.availabilityZone"], &["spec.userData"]),
];

/// Kind-indexed table of provider capabilities.
///
/// Cheap to share: capabilities are reference counted and the registry is
/// read-only once planning starts.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    capabilities: BTreeMap<String, Arc<dyn ResourceCapability>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capabilities: BTreeMap::new(),
        }
    }

    /// Creates a registry pre-populated with the built-in kinds.
    #[must_use]
    pub fn with_builtin_kinds() -> Self {
        let mut registry = Self::new();
        for (kind, label, immutable, sensitive) in BUILTIN_KINDS {
            registry.register(
                StaticCapability::new(*kind, *label)
                    .with_immutable(immutable.iter().copied())
                    .with_sensitive(sensitive.iter().copied())
                    .with_tags(),
            );
        }
        registry
    }

    /// Registers a capability, replacing any previous one for the same kind.
    pub fn register(&mut self, capability: impl ResourceCapability + 'static) {
        let kind = capability.kind().to_string();
        if self.capabilities.insert(kind.clone(), Arc::new(capability)).is_some() {
            debug!("Overriding capability for kind {kind}");
        }
    }

    /// Registers capabilities described in a stack document.
    pub fn extend_from_specs(&mut self, specs: impl IntoIterator<Item = KindSpec>) {
        for spec in specs {
            self.register(StaticCapability::from(spec));
        }
    }

    /// Looks up the capability for a kind.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn ResourceCapability>> {
        self.capabilities.get(kind)
    }

    /// Returns true if a capability is registered for the kind.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.capabilities.contains_key(kind)
    }

    /// Iterates over registered capabilities, sorted by kind.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ResourceCapability>> {
        self.capabilities.values()
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    /// Returns true if no kinds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Evaluates the recreate policy of a kind.
    ///
    /// Unknown kinds never force recreation: the change is kept and planned
    /// as an in-place update.
    #[must_use]
    pub fn recreate_decision<'a>(
        &self,
        kind: &str,
        changed: impl IntoIterator<Item = &'a str>,
    ) -> RecreateDecision {
        self.get(kind).map_or_else(RecreateDecision::default, |capability| {
            capability.recreate_policy().evaluate(changed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds_are_registered() {
        let registry = ProviderRegistry::with_builtin_kinds();
        assert_eq!(registry.len(), BUILTIN_KINDS.len());

        let vm = registry.get("VM").expect("VM is built in");
        assert!(vm.recreate_policy().forces_recreate("spec.vpcId"));
        assert!(vm.taggable());
    }

    #[test]
    fn test_unknown_kind_fails_open() {
        let registry = ProviderRegistry::with_builtin_kinds();
        let decision = registry.recreate_decision("Mainframe", ["spec.vpcId"]);
        assert!(!decision.is_forced());
    }

    #[test]
    fn test_document_specs_override_builtins() {
        let mut registry = ProviderRegistry::with_builtin_kinds();
        registry.extend_from_specs([KindSpec {
            kind: String::from("Queue"),
            label: Some(String::from("FIFO queue")),
            immutable: vec![String::from("spec.retentionDays")],
            sensitive: vec![],
            required: vec![],
            taggable: false,
        }]);

        let queue = registry.get("Queue").expect("queue registered");
        assert_eq!(queue.label(), "FIFO queue");
        assert!(queue.recreate_policy().forces_recreate("spec.retentionDays"));
        assert!(!queue.recreate_policy().forces_recreate("spec.fifo"));
    }
}
