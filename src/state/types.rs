//! Recorded state of deployed resources.
//!
//! The snapshot is what the planner treats as "actual": one entry per
//! resource that exists, keyed by identity, with the attribute tree and
//! dependency list recorded at the last apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resource::{AttributeTree, ResourceIdentity};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// The complete recorded state of one stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// State format version.
    pub version: String,
    /// Stack name.
    pub stack: String,
    /// Environment name.
    pub environment: String,
    /// Tenant owning the stack.
    pub tenant: String,
    /// Resources that currently exist.
    #[serde(default)]
    pub resources: Vec<ActualResource>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
}

/// The observed configuration of an existing resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualResource {
    /// Identity of the resource.
    pub identity: ResourceIdentity,
    /// Provider-assigned ID.
    pub resource_id: String,
    /// Observed attribute tree.
    #[serde(default)]
    pub attributes: AttributeTree,
    /// Dependencies recorded when the resource was last applied.
    #[serde(default)]
    pub depends_on: Vec<ResourceIdentity>,
}

impl StateSnapshot {
    /// Creates an empty snapshot for a stack.
    #[must_use]
    pub fn new(stack: &str, environment: &str, tenant: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            stack: stack.to_string(),
            environment: environment.to_string(),
            tenant: tenant.to_string(),
            resources: Vec::new(),
            last_updated: Utc::now(),
        }
    }

    /// Gets a resource by identity.
    #[must_use]
    pub fn get(&self, identity: &ResourceIdentity) -> Option<&ActualResource> {
        self.resources.iter().find(|r| &r.identity == identity)
    }

    /// Inserts or replaces a resource.
    pub fn upsert(&mut self, resource: ActualResource) {
        match self.resources.iter_mut().find(|r| r.identity == resource.identity) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
        self.last_updated = Utc::now();
    }

    /// Removes a resource.
    pub fn remove(&mut self, identity: &ResourceIdentity) -> Option<ActualResource> {
        let index = self.resources.iter().position(|r| &r.identity == identity)?;
        self.last_updated = Utc::now();
        Some(self.resources.remove(index))
    }

    /// Returns true if the snapshot was written by this state format.
    #[must_use]
    pub fn is_current_version(&self) -> bool {
        self.version == STATE_VERSION
    }

    /// `stack/environment` label used in mismatch errors.
    #[must_use]
    pub fn stack_label(&self) -> String {
        format!("{}/{}", self.stack, self.environment)
    }
}

impl ActualResource {
    /// Creates an actual resource with no recorded dependencies.
    #[must_use]
    pub fn new(identity: ResourceIdentity, resource_id: impl Into<String>, attributes: AttributeTree) -> Self {
        Self {
            identity,
            resource_id: resource_id.into(),
            attributes,
            depends_on: Vec::new(),
        }
    }

    /// Records a dependency.
    #[must_use]
    pub fn depending_on(mut self, identity: ResourceIdentity) -> Self {
        self.depends_on.push(identity);
        self
    }

    /// Resource kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.identity.kind
    }
}
