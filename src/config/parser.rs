//! Configuration parser for loading stack documents.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use crate::error::{ConfigError, Result, StackplanError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::StackConfig;

/// Overrides `stack.environment`.
pub const ENV_ENVIRONMENT: &str = "STACKPLAN_ENVIRONMENT";

/// Overrides `stack.tenant`.
pub const ENV_TENANT: &str = "STACKPLAN_TENANT";

/// Overrides `state.path`.
pub const ENV_STATE_PATH: &str = "STACKPLAN_STATE_PATH";

/// Configuration parser for loading stack documents.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(StackplanError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            StackplanError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<StackConfig> {
        debug!("Parsing YAML configuration");

        let config: StackConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            StackplanError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed stack {} with {} resource(s)",
            config.stack.name,
            config.resources.len()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `STACKPLAN_ENVIRONMENT`, `STACKPLAN_TENANT` and
    /// `STACKPLAN_STATE_PATH`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<StackConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    pub fn apply_overrides(config: &mut StackConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            debug!("Overriding stack.environment from environment");
            config.stack.environment = environment;
        }

        if let Some(tenant) = lookup(ENV_TENANT) {
            debug!("Overriding stack.tenant from environment");
            config.stack.tenant = tenant;
        }

        if let Some(path) = lookup(ENV_STATE_PATH) {
            debug!("Overriding state.path from environment");
            config.state.path = Some(path);
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                StackplanError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["stackplan.yaml", "stackplan.yml"];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(StackplanError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
stack:
  name: test-stack
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("valid config");

        assert_eq!(config.stack.name, "test-stack");
        assert_eq!(config.stack.environment, "dev");
        assert_eq!(config.stack.service, "core");
        assert!(config.resources.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
stack:
  name: shop
  environment: prod
  tenant: acme
  service: storefront

state:
  backend: local
  path: /var/lib/stackplan/shop.json

providers:
  - kind: Topic
    label: Event topic
    immutable: [spec.partitions]
    required: [spec.partitions]

tags:
  default:
    owner: platform

resources:
  - kind: Network
    name: main
    attributes:
      spec:
        cidrBlock: 10.0.0.0/16
  - kind: Database
    name: orders-db
    service: billing
    labels:
      tier: data
    sensitive: [spec.replicaPassword]
    attributes:
      spec:
        engine: postgres
        masterPassword: "${DB_PASSWORD}"
    depends_on:
      - kind: Network
        name: main
        service: storefront

guardrails:
  max_deletes: 0
  protected_kinds: [Database]
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("valid config");

        assert_eq!(config.stack.name, "shop");
        assert_eq!(config.resources.len(), 2);
        assert_eq!(config.resources[1].depends_on.len(), 1);
        assert_eq!(config.providers[0].required, vec!["spec.partitions"]);

        let guardrails = config.guardrails();
        assert_eq!(guardrails.max_deletes, Some(0));
        assert!(guardrails.protected_kinds.contains("Database"));
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        let yaml = "stack:\n  name: shop\nstate:\n  backend: s3\n";
        let err = ConfigParser::new()
            .parse_yaml(yaml, None)
            .expect_err("unsupported backend");
        assert!(matches!(err, StackplanError::Config(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConfigParser::new()
            .parse_yaml("stack:\n  name: shop\n", None)
            .expect("valid config");
        let vars = HashMap::from([
            (ENV_ENVIRONMENT, "staging"),
            (ENV_STATE_PATH, "/tmp/state.json"),
        ]);

        ConfigParser::apply_overrides(&mut config, |name| vars.get(name).map(ToString::to_string));

        assert_eq!(config.stack.environment, "staging");
        assert_eq!(config.stack.tenant, "default");
        assert_eq!(config.state.path.as_deref(), Some("/tmp/state.json"));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let temp = TempDir::new().expect("temp dir");
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("nested dirs");
        std::fs::write(temp.path().join("stackplan.yml"), "stack:\n  name: shop\n").expect("write");

        let found = find_config_file(&nested).expect("config found");
        assert_eq!(found, temp.path().join("stackplan.yml"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().expect("temp dir");
        let err = ConfigParser::new()
            .load_file(temp.path().join("nope.yaml"))
            .expect_err("missing file");
        assert!(matches!(err, StackplanError::Config(ConfigError::FileNotFound { .. })));
    }
}
