//! Conversion of the stack document into desired resources.

use tracing::debug;

use crate::provider::ProviderRegistry;
use crate::resource::{DesiredResource, ResourceMetadata};

use super::spec::StackConfig;
use super::tags::TagResolver;

impl StackConfig {
    /// Desired resources declared by the document, in declaration order.
    ///
    /// Resources of taggable kinds get their effective tags written into the
    /// `tags` attribute. Unknown kinds pass through untouched so the planner
    /// can report them.
    #[must_use]
    pub fn desired_resources(&self, registry: &ProviderRegistry) -> Vec<DesiredResource> {
        let tagger = TagResolver::new(self);

        self.resources
            .iter()
            .map(|resource| {
                let identity = resource.identity(&self.stack);

                let mut attributes = resource.attributes.clone();
                if registry.get(&resource.kind).is_some_and(|c| c.taggable()) {
                    tagger.apply(resource, &identity, &mut attributes);
                }

                let mut depends_on: Vec<_> = resource
                    .depends_on
                    .iter()
                    .map(|dependency| dependency.identity(&identity))
                    .collect();
                depends_on.sort();
                depends_on.dedup();

                debug!("Declared {identity} with {} dependency(ies)", depends_on.len());
                DesiredResource {
                    identity,
                    metadata: ResourceMetadata {
                        name: resource.name.clone(),
                        labels: resource.labels.clone(),
                    },
                    attributes,
                    depends_on,
                    sensitive_paths: resource.sensitive.iter().cloned().collect(),
                }
            })
            .collect()
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
  tenant: acme
providers:
  - kind: Topic
resources:
  - kind: Database
    name: db-1
    sensitive: [spec.replicaPassword]
    attributes:
      spec:
        engine: postgres
  - kind: Topic
    name: events
    depends_on:
      - kind: Database
        name: db-1
      - kind: Database
        name: db-1
",
        )
        .expect("valid config")
    }

    #[test]
    fn test_taggable_kinds_get_tags() {
        let config = config();
        let desired = config.desired_resources(&config.registry());

        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0].attributes["tags"]["managed-by"], json!("stackplan"));
        assert_eq!(desired[0].attributes["spec"]["engine"], json!("postgres"));
        assert!(desired[0].sensitive_paths.contains("spec.replicaPassword"));

        // Declared kinds are not taggable unless they say so.
        assert!(desired[1].attributes.is_null());
    }

    #[test]
    fn test_dependencies_resolve_and_deduplicate() {
        let config = config();
        let desired = config.desired_resources(&config.registry());

        let deps: Vec<String> = desired[1].depends_on.iter().map(ToString::to_string).collect();
        assert_eq!(deps, vec!["Database/acme/core/db-1"]);
        assert_eq!(desired[1].metadata.name, "events");
    }
}
