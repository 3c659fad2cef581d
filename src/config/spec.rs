//! Stack document types for stackplan.
//!
//! This module defines all the structs that map to the `stackplan.yaml` file.
//! The document is declarative and fully describes the desired state of one
//! stack in one environment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::planner::{Guardrails, StackRef};
use crate::provider::{KindSpec, ProviderRegistry};
use crate::resource::{AttributeTree, ResourceIdentity};
use crate::state::STATE_DIR;

/// The root configuration structure for a stack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackConfig {
    /// Stack-level configuration.
    pub stack: StackSection,
    /// State backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Additional or overriding kind definitions.
    #[serde(default)]
    pub providers: Vec<KindSpec>,
    /// Stack-wide tags.
    #[serde(default)]
    pub tags: TagsConfig,
    /// Declared resources.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
    /// Optional guardrails configuration.
    #[serde(default)]
    pub guardrails: Option<Guardrails>,
}

/// Stack-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackSection {
    /// Unique name for the stack.
    pub name: String,
    /// Environment (e.g., "dev", "staging", "prod").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Tenant owning every resource that does not name one.
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Service owning every resource that does not name one.
    #[serde(default = "default_service")]
    pub service: String,
}

/// State backend configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: StateBackend,
    /// Local state file path (for local backend).
    #[serde(default)]
    pub path: Option<String>,
}

/// State backend type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    /// JSON file on the local filesystem.
    #[default]
    Local,
}

/// Stack-wide tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagsConfig {
    /// Tags applied to every taggable resource, lowest precedence.
    #[serde(default)]
    pub default: BTreeMap<String, String>,
}

/// A declared resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceConfig {
    /// Resource kind.
    pub kind: String,
    /// Resource name.
    pub name: String,
    /// Owning service (defaults to the stack's).
    #[serde(default)]
    pub service: Option<String>,
    /// Owning tenant (defaults to the stack's).
    #[serde(default)]
    pub tenant: Option<String>,
    /// Free-form labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Custom tags, highest precedence.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Attribute tree.
    #[serde(default)]
    pub attributes: AttributeTree,
    /// Attribute paths whose values are sensitive.
    #[serde(default)]
    pub sensitive: Vec<String>,
    /// Resources this one depends on.
    #[serde(default)]
    pub depends_on: Vec<DependencyRef>,
}

/// Reference to another resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyRef {
    /// Kind of the referenced resource.
    pub kind: String,
    /// Name of the referenced resource.
    pub name: String,
    /// Service (defaults to the declaring resource's).
    #[serde(default)]
    pub service: Option<String>,
    /// Tenant (defaults to the declaring resource's).
    #[serde(default)]
    pub tenant: Option<String>,
}

// Default value functions

fn default_environment() -> String {
    String::from("dev")
}

fn default_tenant() -> String {
    String::from("default")
}

fn default_service() -> String {
    String::from("core")
}

impl StackConfig {
    /// Stack identifiers stamped on change sets.
    #[must_use]
    pub fn stack_ref(&self) -> StackRef {
        StackRef {
            stack: self.stack.name.clone(),
            environment: self.stack.environment.clone(),
            tenant: self.stack.tenant.clone(),
        }
    }

    /// Built-in kinds plus the kinds declared under `providers`.
    #[must_use]
    pub fn registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::with_builtin_kinds();
        registry.extend_from_specs(self.providers.iter().cloned());
        registry
    }

    /// Identities of every declared resource, in declaration order.
    pub fn identities(&self) -> impl Iterator<Item = ResourceIdentity> + '_ {
        self.resources.iter().map(|r| r.identity(&self.stack))
    }

    /// Path of the local state file.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.state
            .path
            .as_ref()
            .map_or_else(|| PathBuf::from(STATE_DIR).join("state.json"), PathBuf::from)
    }

    /// Guardrails, or an unrestricted set when none are configured.
    #[must_use]
    pub fn guardrails(&self) -> Guardrails {
        self.guardrails.clone().unwrap_or_default()
    }
}

impl ResourceConfig {
    /// Identity of the resource, filling tenant and service from the stack.
    #[must_use]
    pub fn identity(&self, stack: &StackSection) -> ResourceIdentity {
        ResourceIdentity::new(
            self.kind.clone(),
            self.name.clone(),
            self.tenant.clone().unwrap_or_else(|| stack.tenant.clone()),
            self.service.clone().unwrap_or_else(|| stack.service.clone()),
        )
    }
}

impl DependencyRef {
    /// Identity of the referenced resource, filling tenant and service from
    /// the declaring resource.
    #[must_use]
    pub fn identity(&self, declaring: &ResourceIdentity) -> ResourceIdentity {
        ResourceIdentity::new(
            self.kind.clone(),
            self.name.clone(),
            self.tenant.clone().unwrap_or_else(|| declaring.tenant.clone()),
            self.service.clone().unwrap_or_else(|| declaring.service.clone()),
        )
    }
}
