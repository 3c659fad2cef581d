// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stackplan
//!
//! Deterministic, dependency-aware change planning for declarative
//! infrastructure stacks.
//!
//! ## Overview
//!
//! Stackplan compares the resources a stack declares with the resources it
//! last observed and produces an ordered change set:
//!
//! - Attribute-level diffs with sensitive values masked in every output
//! - Per-kind recreate policies for attributes that cannot change in place
//! - Creation and deletion orders that respect declared dependencies
//! - Guardrails and drift reports for CI gating
//!
//! ## Architecture
//!
//! 1. **Desired State**: Declared in `stackplan.yaml`
//! 2. **Actual State**: Loaded from a [`state::StateStore`]
//! 3. **Planner**: Classifies every identity and orders the changes
//!
//! Planning never touches a provider. The change set is a value object for
//! renderers, executors and CI gates.
//!
//! ## Modules
//!
//! - [`resource`]: Resource identities and attribute trees
//! - [`provider`]: Per-kind capabilities and recreate policies
//! - [`planner`]: Diffing, classification, dependency ordering
//! - [`config`]: Stack document parsing, validation and tagging
//! - [`state`]: Observed state storage
//! - [`reconciler`]: Ties configuration, state and planning together
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! stack:
//!   name: shop
//!   environment: prod
//!
//! resources:
//!   - kind: Network
//!     name: main
//!     attributes:
//!       spec:
//!         cidrBlock: 10.0.0.0/16
//!   - kind: VM
//!     name: web-1
//!     attributes:
//!       spec:
//!         size: large
//!     depends_on:
//!       - kind: Network
//!         name: main
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod error;
pub mod planner;
pub mod provider;
pub mod reconciler;
pub mod resource;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, StackConfig};
pub use error::{ClassificationError, PlanError, Result, StackplanError};
pub use planner::{Change, ChangeSet, ChangeSetBuilder, ChangeType, PlanContext, PlanInput, PlanOutcome};
pub use provider::ProviderRegistry;
pub use reconciler::{DriftReport, PlanReport, Reconciler};
pub use resource::{DesiredResource, ResourceIdentity};
pub use state::{ActualResource, LocalStateStore, StateSnapshot, StateStore};
