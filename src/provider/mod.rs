//! Provider registry and per-kind policy.
//!
//! This module holds everything the planner knows about resource kinds:
//! - Immutable attribute paths (recreate policy)
//! - Sensitive attribute paths
//! - Attribute tree validation

mod capability;
pub mod path;
mod policy;
mod registry;

pub use capability::{check_root, KindSpec, ResourceCapability, StaticCapability};
pub use path::PathSet;
pub use policy::{RecreateDecision, RecreatePolicy};
pub use registry::ProviderRegistry;
