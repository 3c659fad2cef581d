//! State management for stackplan.
//!
//! This module provides persistent storage of the observed resources the
//! planner compares the declared stack against.

mod local;
mod store;
mod types;

pub use local::{LocalStateStore, STATE_DIR};
pub use store::StateStore;
#[cfg(test)]
pub use store::MockStateStore;
pub use types::{ActualResource, StateSnapshot, STATE_VERSION};
