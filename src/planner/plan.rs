//! Change set types.
//!
//! This module defines the value objects produced by a planning run: the
//! per-resource [`Change`], the aggregated [`ChangeSet`] and its summary.
//! Downstream consumers (renderers, executors, CI gates) read these and never
//! mutate them.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::resource::ResourceIdentity;

use super::diff::AttributeChange;

/// Kind of change planned for a resource.
///
/// The derived ordering is the display precedence: create, update,
/// recreate, delete, and unchanged resources last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    /// Resource must be created.
    Create,
    /// Resource can be updated in place.
    Update,
    /// Resource must be destroyed and created again.
    Recreate,
    /// Resource must be destroyed.
    Delete,
    /// Resource already matches its declaration.
    NoChange,
}

/// The computed delta and action for one resource identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    /// Identity the change applies to.
    pub identity: ResourceIdentity,
    /// Provider-assigned ID, empty for pure creates.
    pub resource_id: String,
    /// Resource kind.
    pub resource_kind: String,
    /// Resource name.
    pub resource_name: String,
    /// Kind of change.
    pub change_type: ChangeType,
    /// Attribute differences, sorted by path.
    pub attribute_changes: Vec<AttributeChange>,
    /// Why the change is needed. Empty only for `NoChange`.
    pub reason: String,
    /// True iff any attribute change forces recreation.
    pub requires_recreate: bool,
    /// Identities this resource depends on.
    pub depends_on: Vec<ResourceIdentity>,
}

/// Counts of changes per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    /// Resources to create.
    pub create: usize,
    /// Resources to update in place.
    pub update: usize,
    /// Resources to delete.
    pub delete: usize,
    /// Resources to destroy and create again.
    pub recreate: usize,
    /// Resources that already match.
    pub no_change: usize,
    /// create + update + delete + recreate.
    pub total: usize,
}

/// The ordered, summarized collection of all changes of one planning run.
///
/// Changes are in execution order: creates, updates and recreates in
/// dependency order, then deletes in reverse dependency order.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    id: Uuid,
    stack: String,
    environment: String,
    tenant: String,
    desired_hash: String,
    changes: Vec<Change>,
    summary: ChangeSummary,
    created_at: DateTime<Utc>,
}

/// Identifiers of the stack a change set was computed for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackRef {
    /// Stack name.
    pub stack: String,
    /// Environment name.
    pub environment: String,
    /// Tenant name.
    pub tenant: String,
}

impl ChangeType {
    /// Returns true for every type except `NoChange`.
    #[must_use]
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Returns true for types ordered with creation-safe ordering.
    #[must_use]
    pub const fn is_constructive(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Recreate)
    }

    /// Short symbol used in text output.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Recreate => "-/+",
            Self::Delete => "-",
            Self::NoChange => " ",
        }
    }
}

impl Change {
    /// Returns the attribute changes that force recreation.
    pub fn forcing_changes(&self) -> impl Iterator<Item = &AttributeChange> {
        self.attribute_changes.iter().filter(|c| c.force_recreate)
    }

    /// Returns a human-readable description of the change.
    #[must_use]
    pub fn description(&self) -> String {
        let verb = match self.change_type {
            ChangeType::Create => "Create",
            ChangeType::Update => "Update",
            ChangeType::Recreate => "Replace",
            ChangeType::Delete => "Delete",
            ChangeType::NoChange => "No change for",
        };
        format!("{verb} {} '{}'", self.resource_kind, self.resource_name)
    }
}

impl ChangeSummary {
    /// Counts change types.
    #[must_use]
    pub fn tally(types: impl IntoIterator<Item = ChangeType>) -> Self {
        let mut summary = Self::default();
        for change_type in types {
            match change_type {
                ChangeType::Create => summary.create += 1,
                ChangeType::Update => summary.update += 1,
                ChangeType::Recreate => summary.recreate += 1,
                ChangeType::Delete => summary.delete += 1,
                ChangeType::NoChange => summary.no_change += 1,
            }
        }
        summary.total = summary.create + summary.update + summary.delete + summary.recreate;
        summary
    }

    /// Returns the count for one change type.
    #[must_use]
    pub const fn count(&self, change_type: ChangeType) -> usize {
        match change_type {
            ChangeType::Create => self.create,
            ChangeType::Update => self.update,
            ChangeType::Recreate => self.recreate,
            ChangeType::Delete => self.delete,
            ChangeType::NoChange => self.no_change,
        }
    }
}

impl ChangeSet {
    /// Assembles a change set. `changes` must already be in execution order
    /// and must not contain `NoChange` entries; `no_change` is their count.
    #[must_use]
    pub fn new(
        stack: StackRef,
        desired_hash: impl Into<String>,
        changes: Vec<Change>,
        no_change: usize,
    ) -> Self {
        let mut summary = ChangeSummary::tally(changes.iter().map(|c| c.change_type));
        summary.no_change += no_change;
        Self {
            id: Uuid::new_v4(),
            stack: stack.stack,
            environment: stack.environment,
            tenant: stack.tenant,
            desired_hash: desired_hash.into(),
            changes,
            summary,
            created_at: Utc::now(),
        }
    }

    /// Unique ID of the planning run.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Stack name.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Environment name.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Tenant name.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Hash of the desired state the plan was computed from.
    #[must_use]
    pub fn desired_hash(&self) -> &str {
        &self.desired_hash
    }

    /// Changes in execution order.
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Per-type counts.
    #[must_use]
    pub const fn summary(&self) -> &ChangeSummary {
        &self.summary
    }

    /// When the plan was computed.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Finds the change for an identity.
    #[must_use]
    pub fn get(&self, identity: &ResourceIdentity) -> Option<&Change> {
        self.changes.iter().find(|c| &c.identity == identity)
    }

    /// Position of an identity in the execution order.
    #[must_use]
    pub fn position(&self, identity: &ResourceIdentity) -> Option<usize> {
        self.changes.iter().position(|c| &c.identity == identity)
    }

    /// Changes of one type, in execution order.
    pub fn of_type(&self, change_type: ChangeType) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.change_type == change_type)
    }

    /// Changes grouped by display precedence (create, update, recreate, delete),
    /// each group in execution order.
    #[must_use]
    pub fn by_display_precedence(&self) -> Vec<&Change> {
        let mut grouped: Vec<&Change> = self.changes.iter().collect();
        grouped.sort_by_key(|c| c.change_type);
        grouped
    }

    /// SHA-256 over the serialized change list.
    ///
    /// Sensitive values are masked before hashing, so two plans that differ
    /// only in a secret's value share a fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for change in &self.changes {
            let record = serde_json::to_vec(&ChangeRecord::from(change)).unwrap_or_default();
            hasher.update(&record);
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Serialized form of a [`Change`] for CI and tooling.
#[derive(Debug, Serialize)]
pub struct ChangeRecord<'a> {
    /// Provider-assigned ID.
    pub resource_id: &'a str,
    /// Resource name.
    pub resource_name: &'a str,
    /// Resource kind.
    pub resource_kind: &'a str,
    /// Change type.
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Owning service.
    pub service: &'a str,
    /// Attribute changes, sensitive values omitted.
    pub attribute_changes: &'a [AttributeChange],
    /// Reason for the change.
    pub reason: &'a str,
    /// Whether the resource is replaced.
    pub requires_recreate: bool,
    /// Dependencies, as identity strings.
    #[serde(serialize_with = "serialize_identities")]
    pub depends_on: &'a [ResourceIdentity],
}

impl<'a> From<&'a Change> for ChangeRecord<'a> {
    fn from(change: &'a Change) -> Self {
        Self {
            resource_id: &change.resource_id,
            resource_name: &change.resource_name,
            resource_kind: &change.resource_kind,
            change_type: change.change_type,
            service: &change.identity.service,
            attribute_changes: &change.attribute_changes,
            reason: &change.reason,
            requires_recreate: change.requires_recreate,
            depends_on: &change.depends_on,
        }
    }
}

impl Serialize for Change {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ChangeRecord::from(self).serialize(serializer)
    }
}

fn serialize_identities<S: Serializer>(
    identities: &&[ResourceIdentity],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(identities.iter().map(ToString::to_string))
}

/// Serialized form of a [`ChangeSet`].
#[derive(Debug, Serialize)]
struct ChangeSetRecord<'a> {
    id: Uuid,
    stack: &'a str,
    environment: &'a str,
    tenant: &'a str,
    desired_hash: &'a str,
    created_at: DateTime<Utc>,
    summary: &'a ChangeSummary,
    changes: &'a [Change],
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ChangeSetRecord {
            id: self.id,
            stack: &self.stack,
            environment: &self.environment,
            tenant: &self.tenant,
            desired_hash: &self.desired_hash,
            created_at: self.created_at,
            summary: &self.summary,
            changes: &self.changes,
        }
        .serialize(serializer)
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Recreate => "recreate",
            Self::Delete => "delete",
            Self::NoChange => "no-change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.change_type.symbol(), self.identity)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.changes.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Change set ({} changes):", self.changes.len())?;
        for (i, change) in self.changes.iter().enumerate() {
            writeln!(f, "  {i}. {change}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(name: &str, change_type: ChangeType) -> Change {
        Change {
            identity: ResourceIdentity::new("Queue", name, "acme", "core"),
            resource_id: String::new(),
            resource_kind: String::from("Queue"),
            resource_name: name.to_string(),
            change_type,
            attribute_changes: vec![],
            reason: String::from("test"),
            requires_recreate: false,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_display_precedence() {
        assert!(ChangeType::Create < ChangeType::Update);
        assert!(ChangeType::Update < ChangeType::Recreate);
        assert!(ChangeType::Recreate < ChangeType::Delete);
        assert!(ChangeType::Delete < ChangeType::NoChange);
    }

    #[test]
    fn test_summary_excludes_no_change_from_total() {
        let summary = ChangeSummary::tally([
            ChangeType::Create,
            ChangeType::Create,
            ChangeType::Update,
            ChangeType::Delete,
            ChangeType::Recreate,
            ChangeType::NoChange,
        ]);
        assert_eq!(summary.create, 2);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.total, 5);
    }

    #[test]
    fn test_change_set_counts_unchanged_resources() {
        let set = ChangeSet::new(
            StackRef::default(),
            "hash",
            vec![change("q-1", ChangeType::Create), change("q-2", ChangeType::Delete)],
            3,
        );
        assert_eq!(set.summary().total, 2);
        assert_eq!(set.summary().no_change, 3);
        assert_eq!(set.of_type(ChangeType::Delete).count(), 1);
    }

    #[test]
    fn test_record_field_names() {
        let mut c = change("q-1", ChangeType::Update);
        c.depends_on.push(ResourceIdentity::new("Network", "net-1", "acme", "core"));
        let value = serde_json::to_value(&c).expect("serializable");

        assert_eq!(value["type"], json!("update"));
        assert_eq!(value["service"], json!("core"));
        assert_eq!(value["depends_on"], json!(["Network/acme/core/net-1"]));
        for field in [
            "resource_id",
            "resource_name",
            "resource_kind",
            "attribute_changes",
            "reason",
            "requires_recreate",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }

    fn password_change(old: &str, new: &str, sensitive: bool) -> ChangeSet {
        let mut c = change("q-1", ChangeType::Update);
        c.attribute_changes.push(AttributeChange {
            path: String::from("spec.password"),
            old_value: Some(json!(old)),
            new_value: Some(json!(new)),
            sensitive,
            force_recreate: false,
        });
        ChangeSet::new(StackRef::default(), "hash", vec![c], 0)
    }

    #[test]
    fn test_fingerprint_ignores_sensitive_values() {
        let first = password_change("hunter2", "correct-horse", true);
        let second = password_change("letmein", "battery-staple", true);
        assert_eq!(first.fingerprint(), second.fingerprint());

        // Non-sensitive values still count.
        let plain_first = password_change("hunter2", "correct-horse", false);
        let plain_second = password_change("letmein", "battery-staple", false);
        assert_ne!(plain_first.fingerprint(), plain_second.fingerprint());
    }

    #[test]
    fn test_no_change_serializes_kebab_case() {
        let value = serde_json::to_value(ChangeType::NoChange).expect("serializable");
        assert_eq!(value, json!("no-change"));
    }

    #[test]
    fn test_fingerprint_is_stable_and_ignores_run_metadata() {
        let changes = vec![change("q-1", ChangeType::Create)];
        let a = ChangeSet::new(StackRef::default(), "h", changes.clone(), 0);
        let b = ChangeSet::new(StackRef::default(), "h", changes, 0);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_by_display_precedence_groups_types() {
        let set = ChangeSet::new(
            StackRef::default(),
            "h",
            vec![
                change("a", ChangeType::Update),
                change("b", ChangeType::Create),
                change("c", ChangeType::Delete),
                change("d", ChangeType::Recreate),
            ],
            0,
        );
        let names: Vec<&str> = set
            .by_display_precedence()
            .iter()
            .map(|c| c.resource_name.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a", "d", "c"]);
    }
}
