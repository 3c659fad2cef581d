//! Classification of a single (desired, actual) resource pair.

use tracing::debug;

use crate::error::ClassificationError;
use crate::provider::{ProviderRegistry, ResourceCapability};
use crate::resource::{DesiredResource, ResourceIdentity};
use crate::state::ActualResource;

use super::diff::{AttributeChange, AttributeDiffer};
use super::plan::{Change, ChangeType};

/// Reason attached to creates.
pub const REASON_CREATE: &str = "resource does not exist";

/// Reason attached to deletes.
pub const REASON_DELETE: &str = "resource no longer declared";

/// Classifies resource pairs into changes.
///
/// Stateless: the only thing it holds is a shared reference to the
/// read-only provider registry.
#[derive(Debug, Clone, Copy)]
pub struct ResourceComparator<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> ResourceComparator<'a> {
    /// Creates a comparator backed by a provider registry.
    #[must_use]
    pub const fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Classifies one resource pair.
    ///
    /// Returns `Ok(None)` when neither side exists.
    ///
    /// # Errors
    ///
    /// Returns a classification error when the desired resource uses a kind
    /// with no registered capability or its attribute tree is malformed.
    pub fn compare(
        &self,
        identity: &ResourceIdentity,
        desired: Option<&DesiredResource>,
        actual: Option<&ActualResource>,
    ) -> Result<Option<Change>, ClassificationError> {
        let change = match (desired, actual) {
            (None, None) => return Ok(None),
            (Some(desired), actual) => {
                let capability = self.capability_for(identity, desired)?;
                match actual {
                    None => Self::create(identity, desired),
                    Some(actual) => Self::diff_pair(identity, capability, desired, actual),
                }
            }
            (None, Some(actual)) => Self::delete(identity, actual),
        };

        debug!("{identity}: {}", change.change_type);
        Ok(Some(change))
    }

    fn capability_for(
        &self,
        identity: &ResourceIdentity,
        desired: &DesiredResource,
    ) -> Result<&'a dyn ResourceCapability, ClassificationError> {
        let capability = self.registry.get(desired.kind()).ok_or_else(|| {
            ClassificationError::UnknownKind {
                identity: identity.clone(),
                kind: desired.kind().to_string(),
            }
        })?;

        capability
            .validate_attributes(&desired.attributes)
            .map_err(|message| ClassificationError::MalformedAttributes {
                identity: identity.clone(),
                message,
            })?;

        Ok(&**capability)
    }

    fn create(identity: &ResourceIdentity, desired: &DesiredResource) -> Change {
        Change {
            identity: identity.clone(),
            resource_id: String::new(),
            resource_kind: identity.kind.clone(),
            resource_name: desired.metadata.name.clone(),
            change_type: ChangeType::Create,
            attribute_changes: Vec::new(),
            reason: String::from(REASON_CREATE),
            requires_recreate: false,
            depends_on: sorted_unique(&desired.depends_on),
        }
    }

    fn delete(identity: &ResourceIdentity, actual: &ActualResource) -> Change {
        Change {
            identity: identity.clone(),
            resource_id: actual.resource_id.clone(),
            resource_kind: identity.kind.clone(),
            resource_name: identity.name.clone(),
            change_type: ChangeType::Delete,
            attribute_changes: Vec::new(),
            reason: String::from(REASON_DELETE),
            requires_recreate: false,
            depends_on: sorted_unique(&actual.depends_on),
        }
    }

    fn diff_pair(
        identity: &ResourceIdentity,
        capability: &dyn ResourceCapability,
        desired: &DesiredResource,
        actual: &ActualResource,
    ) -> Change {
        let mut sensitive = capability.sensitive_paths().clone();
        for path in &desired.sensitive_paths {
            sensitive.insert(path.clone());
        }

        let policy = capability.recreate_policy();
        let mut attribute_changes = AttributeDiffer::new(&sensitive)
            .diff(Some(&actual.attributes), Some(&desired.attributes));
        for change in &mut attribute_changes {
            change.force_recreate = policy.forces_recreate(&change.path);
        }

        let triggers: Vec<&str> = attribute_changes
            .iter()
            .filter(|c| c.force_recreate)
            .map(|c| c.path.as_str())
            .collect();

        let (change_type, reason) = if attribute_changes.is_empty() {
            (ChangeType::NoChange, String::new())
        } else if triggers.is_empty() {
            (ChangeType::Update, update_reason(&attribute_changes))
        } else {
            (ChangeType::Recreate, recreate_reason(&triggers))
        };
        let requires_recreate = change_type == ChangeType::Recreate;

        Change {
            identity: identity.clone(),
            resource_id: actual.resource_id.clone(),
            resource_kind: identity.kind.clone(),
            resource_name: desired.metadata.name.clone(),
            change_type,
            attribute_changes,
            reason,
            requires_recreate,
            depends_on: sorted_unique(&desired.depends_on),
        }
    }
}

fn update_reason(changes: &[AttributeChange]) -> String {
    let count = changes.len();
    let noun = if count == 1 { "attribute" } else { "attributes" };
    format!("{count} {noun} changed")
}

fn recreate_reason(triggers: &[&str]) -> String {
    match triggers {
        [single] => format!("attribute {single} requires replacement"),
        many => format!("attributes {} require replacement", many.join(", ")),
    }
}

fn sorted_unique(identities: &[ResourceIdentity]) -> Vec<ResourceIdentity> {
    let mut sorted = identities.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StaticCapability;
    use serde_json::json;

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(StaticCapability::new("Queue", "Message queue"));
        registry.register(
            StaticCapability::new("VM", "Virtual machine")
                .with_immutable(["spec.vpcId"])
                .with_sensitive(["spec.userData"]),
        );
        registry
    }

    fn id(kind: &str, name: &str) -> ResourceIdentity {
        ResourceIdentity::new(kind, name, "acme", "core")
    }

    fn actual(identity: &ResourceIdentity, attributes: serde_json::Value) -> ActualResource {
        ActualResource::new(identity.clone(), format!("{}-id", identity.name), attributes)
    }

    #[test]
    fn test_neither_side_is_skipped() {
        let registry = registry();
        let result = ResourceComparator::new(&registry).compare(&id("Queue", "q"), None, None);
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn test_missing_actual_is_create() {
        let registry = registry();
        let identity = id("Queue", "queue-1");
        let desired = DesiredResource::new(identity.clone(), json!({"spec": {"retentionDays": 7}}));

        let change = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), None)
            .expect("classified")
            .expect("change emitted");

        assert_eq!(change.change_type, ChangeType::Create);
        assert!(change.reason.contains("does not exist"));
        assert!(change.resource_id.is_empty());
        assert!(change.attribute_changes.is_empty());
    }

    #[test]
    fn test_missing_desired_is_delete_with_actual_id() {
        let registry = registry();
        let identity = id("Queue", "cache-1");
        let observed = actual(&identity, json!({}));

        let change = ResourceComparator::new(&registry)
            .compare(&identity, None, Some(&observed))
            .expect("classified")
            .expect("change emitted");

        assert_eq!(change.change_type, ChangeType::Delete);
        assert_eq!(change.resource_id, "cache-1-id");
        assert_eq!(change.resource_name, "cache-1");
        assert_eq!(change.reason, REASON_DELETE);
    }

    #[test]
    fn test_identical_pair_is_no_change() {
        let registry = registry();
        let identity = id("Queue", "queue-1");
        let tree = json!({"spec": {"retentionDays": 7}});
        let desired = DesiredResource::new(identity.clone(), tree.clone());
        let observed = actual(&identity, tree);

        let change = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), Some(&observed))
            .expect("classified")
            .expect("change emitted");

        assert_eq!(change.change_type, ChangeType::NoChange);
        assert!(change.attribute_changes.is_empty());
        assert!(change.reason.is_empty());
        assert_eq!(change.resource_id, "queue-1-id");
    }

    #[test]
    fn test_mutable_difference_is_update() {
        let registry = registry();
        let identity = id("Queue", "queue-1");
        let desired = DesiredResource::new(identity.clone(), json!({"spec": {"retentionDays": 14}}));
        let observed = actual(&identity, json!({"spec": {"retentionDays": 7}}));

        let change = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), Some(&observed))
            .expect("classified")
            .expect("change emitted");

        assert_eq!(change.change_type, ChangeType::Update);
        assert_eq!(change.reason, "1 attribute changed");
        assert_eq!(change.attribute_changes.len(), 1);
        assert!(!change.attribute_changes[0].force_recreate);
        assert!(!change.requires_recreate);
    }

    #[test]
    fn test_immutable_difference_is_recreate() {
        let registry = registry();
        let identity = id("VM", "vm-1");
        let desired = DesiredResource::new(
            identity.clone(),
            json!({"spec": {"vpcId": "vpc-b", "size": "large"}}),
        );
        let observed = actual(&identity, json!({"spec": {"vpcId": "vpc-a", "size": "small"}}));

        let change = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), Some(&observed))
            .expect("classified")
            .expect("change emitted");

        assert_eq!(change.change_type, ChangeType::Recreate);
        assert!(change.requires_recreate);
        assert_eq!(change.reason, "attribute spec.vpcId requires replacement");
        let forced: Vec<&str> = change.forcing_changes().map(|c| c.path.as_str()).collect();
        assert_eq!(forced, vec!["spec.vpcId"]);
    }

    #[test]
    fn test_sensitive_paths_merge_capability_and_declaration() {
        let registry = registry();
        let identity = id("VM", "vm-1");
        let desired = DesiredResource::new(
            identity.clone(),
            json!({"spec": {"vpcId": "vpc-a", "userData": "new", "apiKey": "k2"}}),
        )
        .with_sensitive("spec.apiKey");
        let observed = actual(
            &identity,
            json!({"spec": {"vpcId": "vpc-a", "userData": "old", "apiKey": "k1"}}),
        );

        let change = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), Some(&observed))
            .expect("classified")
            .expect("change emitted");

        assert_eq!(change.attribute_changes.len(), 2);
        assert!(change.attribute_changes.iter().all(|c| c.sensitive));
    }

    #[test]
    fn test_unknown_kind_is_classification_error() {
        let registry = registry();
        let identity = id("Mainframe", "mf-1");
        let desired = DesiredResource::new(identity.clone(), json!({}));

        let err = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), None)
            .expect_err("unknown kind");

        assert_eq!(err.identity(), &identity);
        assert!(matches!(err, ClassificationError::UnknownKind { .. }));
    }

    #[test]
    fn test_malformed_tree_is_classification_error() {
        let registry = registry();
        let identity = id("Queue", "queue-1");
        let desired = DesiredResource::new(identity.clone(), json!("not a mapping"));

        let err = ResourceComparator::new(&registry)
            .compare(&identity, Some(&desired), None)
            .expect_err("malformed tree");

        assert!(matches!(err, ClassificationError::MalformedAttributes { .. }));
    }

    #[test]
    fn test_unknown_kind_can_still_be_deleted() {
        let registry = registry();
        let identity = id("Mainframe", "mf-1");
        let observed = actual(&identity, json!({}));

        let change = ResourceComparator::new(&registry)
            .compare(&identity, None, Some(&observed))
            .expect("deletes need no capability")
            .expect("change emitted");
        assert_eq!(change.change_type, ChangeType::Delete);
    }
}
