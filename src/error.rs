//! Error types for the stackplan planning engine.
//!
//! Errors are split by how far they propagate. Classification errors are
//! scoped to one resource and are collected next to a still-usable plan.
//! Structural and cancellation errors abort the whole planning call.

use std::path::PathBuf;
use thiserror::Error;

use crate::resource::ResourceIdentity;

/// The main error type for stackplan.
#[derive(Debug, Error)]
pub enum StackplanError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State store errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Fatal planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The stack document was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The stack document could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// State store errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State file not found.
    #[error("State file not found: {path}")]
    NotFound {
        /// Path to the missing state file.
        path: PathBuf,
    },

    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State could not be written.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },

    /// The snapshot belongs to a different stack or environment.
    #[error("State belongs to {found}, expected {expected}")]
    StackMismatch {
        /// Stack the caller is planning.
        expected: String,
        /// Stack recorded in the snapshot.
        found: String,
    },
}

/// Errors that abort a planning call. No change set is returned with these.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The declared dependencies contain a cycle.
    #[error("Dependency cycle detected: {}", .cycle.join(" -> "))]
    DependencyCycle {
        /// Identities along the cycle, first node repeated at the end.
        cycle: Vec<String>,
    },

    /// The caller cancelled the planning call.
    #[error("Planning was cancelled")]
    Cancelled,

    /// The input contains two resources with the same identity on one side.
    #[error("Duplicate {side} resource for identity {identity}")]
    DuplicateIdentity {
        /// Which collection held the duplicate ("desired" or "actual").
        side: &'static str,
        /// The duplicated identity.
        identity: String,
    },

    /// A comparison worker died before reporting its results.
    #[error("Comparison worker failed: {message}")]
    WorkerFailed {
        /// Description of the failure.
        message: String,
    },
}

/// Per-resource classification errors.
///
/// These never abort a plan. The builder collects them next to the partial
/// change set and lets the caller decide whether to proceed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    /// No provider capability is registered for the resource kind.
    #[error("{identity}: no provider capability registered for kind '{kind}'")]
    UnknownKind {
        /// Resource that could not be classified.
        identity: ResourceIdentity,
        /// The unregistered kind.
        kind: String,
    },

    /// The attribute tree does not have the shape the kind expects.
    #[error("{identity}: malformed attribute tree: {message}")]
    MalformedAttributes {
        /// Resource that could not be classified.
        identity: ResourceIdentity,
        /// What is wrong with the tree.
        message: String,
    },
}

/// Result type alias for stackplan operations.
pub type Result<T> = std::result::Result<T, StackplanError>;

impl StackplanError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error came from a caller-initiated cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Plan(PlanError::Cancelled))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a parse error without a source location.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location: None,
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }
}

impl PlanError {
    /// Builds a cycle error from the identities along the cycle.
    #[must_use]
    pub fn cycle(path: &[ResourceIdentity]) -> Self {
        Self::DependencyCycle {
            cycle: path.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns true for errors that come from the shape of the input graph.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(self, Self::DependencyCycle { .. } | Self::DuplicateIdentity { .. })
    }
}

impl ClassificationError {
    /// Returns the identity of the resource that failed classification.
    #[must_use]
    pub const fn identity(&self) -> &ResourceIdentity {
        match self {
            Self::UnknownKind { identity, .. } | Self::MalformedAttributes { identity, .. } => {
                identity
            }
        }
    }
}
