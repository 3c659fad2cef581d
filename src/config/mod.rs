//! Configuration module for stackplan.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `stackplan.yaml`
//! - Validation of configuration values
//! - Tag resolution and conversion into desired resources
//! - Computing desired-state hashes for change detection

mod desired;
mod hash;
mod parser;
mod spec;
mod tags;
mod validator;

pub use hash::ConfigHasher;
pub use parser::{
    ConfigParser, find_config_file, DEFAULT_CONFIG_FILES, ENV_ENVIRONMENT, ENV_STATE_PATH, ENV_TENANT,
};
pub use spec::{
    DependencyRef, ResourceConfig, StackConfig, StackSection, StateBackend, StateConfig, TagsConfig,
};
pub use tags::{TagResolver, MANAGED_BY, TAGS_ATTRIBUTE};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
