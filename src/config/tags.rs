//! Tag resolution for taggable kinds.
//!
//! Effective tags are merged with a fixed precedence, lowest first: stack
//! defaults, resource labels, standard tags, custom tags. The result is a
//! sorted map written to the `tags` attribute.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::resource::{AttributeTree, ResourceIdentity};

use super::spec::{ResourceConfig, StackConfig};

/// Value of the `managed-by` standard tag.
pub const MANAGED_BY: &str = "stackplan";

/// Attribute holding the effective tags.
pub const TAGS_ATTRIBUTE: &str = "tags";

/// Resolves effective tags for declared resources.
#[derive(Debug, Clone, Copy)]
pub struct TagResolver<'a> {
    config: &'a StackConfig,
}

impl<'a> TagResolver<'a> {
    /// Creates a resolver for a stack document.
    #[must_use]
    pub const fn new(config: &'a StackConfig) -> Self {
        Self { config }
    }

    /// Tags every managed resource carries.
    #[must_use]
    pub fn standard_tags(&self, identity: &ResourceIdentity) -> BTreeMap<String, String> {
        let stack = &self.config.stack;
        BTreeMap::from([
            (String::from("stack"), stack.name.clone()),
            (String::from("environment"), stack.environment.clone()),
            (String::from("tenant"), identity.tenant.clone()),
            (String::from("service"), identity.service.clone()),
            (String::from("managed-by"), String::from(MANAGED_BY)),
        ])
    }

    /// Effective tags of a resource, without anything already present in
    /// its `tags` attribute.
    #[must_use]
    pub fn resolve(&self, resource: &ResourceConfig, identity: &ResourceIdentity) -> BTreeMap<String, String> {
        let mut tags = self.base_tags(resource, identity);
        tags.extend(resource.tags.clone());
        tags
    }

    /// Defaults, then labels, then standard tags.
    fn base_tags(&self, resource: &ResourceConfig, identity: &ResourceIdentity) -> BTreeMap<String, String> {
        let mut tags = self.config.tags.default.clone();
        tags.extend(resource.labels.clone());
        tags.extend(self.standard_tags(identity));
        tags
    }

    /// Writes effective tags into an attribute tree.
    ///
    /// Entries already under `tags` rank just below the custom tags. A tree
    /// whose root is not a mapping is left untouched.
    pub fn apply(&self, resource: &ResourceConfig, identity: &ResourceIdentity, attributes: &mut AttributeTree) {
        if attributes.is_null() {
            *attributes = Value::Object(Map::new());
        }
        let Value::Object(root) = attributes else {
            return;
        };

        let mut merged: Map<String, Value> = Map::new();
        for (key, value) in self.base_tags(resource, identity) {
            merged.insert(key, Value::String(value));
        }
        if let Some(Value::Object(declared)) = root.get(TAGS_ATTRIBUTE) {
            for (key, value) in declared {
                merged.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &resource.tags {
            merged.insert(key.clone(), Value::String(value.clone()));
        }

        root.insert(String::from(TAGS_ATTRIBUTE), Value::Object(merged));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> StackConfig {
        serde_yaml::from_str(
            r"
stack:
  name: shop
  environment: prod
  tenant: acme
tags:
  default:
    owner: platform
    team: infra
    stack: overridden-by-standard
resources:
  - kind: VM
    name: web-1
    labels:
      team: web
      environment: overridden-by-standard
    tags:
      owner: web-team
      managed-by: custom-wins
    attributes:
      spec:
        size: large
",
        )
        .expect("valid config")
    }

    #[test]
    fn test_precedence() {
        let config = config();
        let resource = &config.resources[0];
        let identity = resource.identity(&config.stack);

        let tags = TagResolver::new(&config).resolve(resource, &identity);

        assert_eq!(tags["owner"], "web-team");
        assert_eq!(tags["team"], "web");
        assert_eq!(tags["stack"], "shop");
        assert_eq!(tags["environment"], "prod");
        assert_eq!(tags["tenant"], "acme");
        assert_eq!(tags["service"], "core");
        assert_eq!(tags["managed-by"], "custom-wins");
    }

    #[test]
    fn test_apply_writes_sorted_tags() {
        let config = config();
        let resource = &config.resources[0];
        let identity = resource.identity(&config.stack);
        let mut attributes = resource.attributes.clone();

        TagResolver::new(&config).apply(resource, &identity, &mut attributes);

        let keys: Vec<&String> = attributes["tags"]
            .as_object()
            .expect("tags mapping")
            .keys()
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(attributes["spec"]["size"], json!("large"));
    }

    #[test]
    fn test_declared_tag_attribute_ranks_below_custom_tags() {
        let config = config();
        let resource = &config.resources[0];
        let identity = resource.identity(&config.stack);
        let mut attributes = json!({"tags": {"owner": "from-attributes", "cost-center": "42"}});

        TagResolver::new(&config).apply(resource, &identity, &mut attributes);

        assert_eq!(attributes["tags"]["owner"], json!("web-team"));
        assert_eq!(attributes["tags"]["cost-center"], json!("42"));
    }

    #[test]
    fn test_non_mapping_root_is_untouched() {
        let config = config();
        let resource = &config.resources[0];
        let identity = resource.identity(&config.stack);
        let mut attributes = json!(["not", "a", "mapping"]);

        TagResolver::new(&config).apply(resource, &identity, &mut attributes);
        assert_eq!(attributes, json!(["not", "a", "mapping"]));
    }
}
