//! Configuration validation for stack documents.
//!
//! This module checks a parsed document for problems the planner would
//! otherwise report late or not at all: bad names, duplicate declarations
//! and broken dependency references.

use crate::error::{ConfigError, Result, StackplanError};
use std::collections::BTreeSet;
use tracing::debug;

use super::spec::{ResourceConfig, StackConfig};

/// Validator for stack documents.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a stack document.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &StackConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(StackplanError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Runs every check and returns all findings.
    #[must_use]
    pub fn check(&self, config: &StackConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_stack(config, &mut result);
        Self::validate_providers(config, &mut result);
        Self::validate_resources(config, &mut result);
        Self::validate_dependencies(config, &mut result);

        result
    }

    /// Validates stack configuration.
    fn validate_stack(config: &StackConfig, result: &mut ValidationResult) {
        let stack = &config.stack;
        if stack.name.is_empty() {
            result.error("stack.name", "Stack name cannot be empty");
        } else if !is_valid_name(&stack.name) {
            result.error(
                "stack.name",
                format!(
                    "Stack name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                    stack.name
                ),
            );
        }

        if stack.environment.is_empty() {
            result.error("stack.environment", "Environment cannot be empty");
        }
        if stack.tenant.is_empty() {
            result.error("stack.tenant", "Tenant cannot be empty");
        }
        if stack.service.is_empty() {
            result.error("stack.service", "Service cannot be empty");
        }
    }

    /// Validates kind definitions.
    fn validate_providers(config: &StackConfig, result: &mut ValidationResult) {
        let mut seen = BTreeSet::new();
        for (i, spec) in config.providers.iter().enumerate() {
            if spec.kind.is_empty() {
                result.error(format!("providers[{i}].kind"), "Kind cannot be empty");
            } else if !seen.insert(spec.kind.as_str()) {
                result.error(
                    format!("providers[{i}].kind"),
                    format!("Kind '{}' is defined more than once", spec.kind),
                );
            }
        }
    }

    /// Validates declared resources.
    fn validate_resources(config: &StackConfig, result: &mut ValidationResult) {
        if config.resources.is_empty() {
            result.warnings.push(String::from("No resources defined in configuration"));
            return;
        }

        let registry = config.registry();
        let mut seen = BTreeSet::new();

        for (i, resource) in config.resources.iter().enumerate() {
            let field = format!("resources[{i}]");

            if resource.kind.is_empty() {
                result.error(format!("{field}.kind"), "Resource kind cannot be empty");
            } else if !registry.contains(&resource.kind) {
                result.warnings.push(format!(
                    "{field}: kind '{}' has no registered capability and cannot be planned",
                    resource.kind
                ));
            }

            if !is_valid_name(&resource.name) {
                result.error(
                    format!("{field}.name"),
                    format!(
                        "Resource name '{}' is invalid. Must be lowercase alphanumeric with hyphens.",
                        resource.name
                    ),
                );
            }

            let identity = resource.identity(&config.stack);
            for (segment, value) in [
                ("kind", &identity.kind),
                ("tenant", &identity.tenant),
                ("service", &identity.service),
            ] {
                if value.contains('/') {
                    result.error(
                        format!("{field}.{segment}"),
                        format!("Resource {segment} '{value}' cannot contain '/'"),
                    );
                }
            }

            if !seen.insert(identity.clone()) {
                result.error(field.clone(), format!("Duplicate resource declaration: {identity}"));
            }

            if !resource.attributes.is_object() && !resource.attributes.is_null() {
                result.error(format!("{field}.attributes"), "Attributes must be a mapping");
            }

            Self::validate_sensitive_paths(resource, &field, result);
        }
    }

    fn validate_sensitive_paths(resource: &ResourceConfig, field: &str, result: &mut ValidationResult) {
        for (j, path) in resource.sensitive.iter().enumerate() {
            if let Err(message) = crate::provider::path::parse(path) {
                result.error(format!("{field}.sensitive[{j}]"), message);
            }
        }
    }

    /// Validates dependency references.
    fn validate_dependencies(config: &StackConfig, result: &mut ValidationResult) {
        let declared: BTreeSet<_> = config.identities().collect();

        for (i, resource) in config.resources.iter().enumerate() {
            let identity = resource.identity(&config.stack);
            for (j, dependency) in resource.depends_on.iter().enumerate() {
                let target = dependency.identity(&identity);
                if target == identity {
                    result.error(
                        format!("resources[{i}].depends_on[{j}]"),
                        format!("{identity} cannot depend on itself"),
                    );
                } else if !declared.contains(&target) {
                    result.warnings.push(format!(
                        "{identity} depends on {target}, which is not declared in this document"
                    ));
                }
            }
        }
    }
}

/// Validates that a name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();

    // First character must be a letter
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {}
        _ => return false,
    }

    // Rest must be lowercase alphanumeric or hyphen
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(yaml: &str) -> StackConfig {
        ConfigParser::new().parse_yaml(yaml, None).expect("valid yaml")
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("db-1"));
        assert!(is_valid_name("my-queue-123"));
        assert!(is_valid_name("a"));
    }

    #[test]
    fn test_invalid_name() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("Db-1")); // uppercase
        assert!(!is_valid_name("1-db")); // starts with number
        assert!(!is_valid_name("db_1")); // underscore
        assert!(!is_valid_name("db-")); // ends with hyphen
        assert!(!is_valid_name("db--1")); // consecutive hyphens
    }

    #[test]
    fn test_valid_document_passes() {
        let config = parse(
            r"
stack:
  name: shop
resources:
  - kind: Network
    name: main
  - kind: VM
    name: web-1
    depends_on:
      - kind: Network
        name: main
",
        );
        let result = ConfigValidator::new().validate(&config).expect("valid");
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
    }

    #[test]
    fn test_duplicate_and_self_dependency_are_errors() {
        let config = parse(
            r"
stack:
  name: shop
resources:
  - kind: Queue
    name: jobs
  - kind: Queue
    name: jobs
    depends_on:
      - kind: Queue
        name: jobs
",
        );
        let result = ConfigValidator::new().check(&config);
        assert_eq!(result.error_count(), 2);
        assert!(result.errors.iter().any(|e| e.message.contains("Duplicate")));
        assert!(result.errors.iter().any(|e| e.message.contains("itself")));
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_slash_in_identity_segment_is_error() {
        let config = parse(
            r"
stack:
  name: shop
  tenant: acme/eu
resources:
  - kind: Queue
    name: jobs
  - kind: Queue
    name: mail
    tenant: acme
    service: eu/core
",
        );
        let result = ConfigValidator::new().check(&config);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["resources[0].tenant", "resources[1].service"]);
    }

    #[test]
    fn test_undeclared_dependency_is_warning() {
        let config = parse(
            r"
stack:
  name: shop
resources:
  - kind: VM
    name: web-1
    depends_on:
      - kind: Network
        name: shared
",
        );
        let result = ConfigValidator::new().validate(&config).expect("still valid");
        assert_eq!(result.warning_count(), 1);
        assert!(result.warnings[0].contains("not declared"));
    }

    #[test]
    fn test_bad_names_and_shapes() {
        let config = parse(
            r"
stack:
  name: Shop
resources:
  - kind: ''
    name: web_1
    attributes: [1, 2]
    sensitive: ['spec[']
",
        );
        let result = ConfigValidator::new().check(&config);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "stack.name",
                "resources[0].kind",
                "resources[0].name",
                "resources[0].attributes",
                "resources[0].sensitive[0]",
            ]
        );
    }
}
