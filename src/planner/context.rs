//! Per-call planning context.
//!
//! Carries the cancellation signal and the diagnostics sink into a planning
//! call, so the planner itself holds no process-wide state.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::resource::ResourceIdentity;

/// Severity of a planning diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Something the operator should look at; planning continues.
    Warning,
}

/// A non-fatal observation made while planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Resource the diagnostic is about, if any.
    pub identity: Option<ResourceIdentity>,
    /// Message.
    pub message: String,
}

/// Receives diagnostics emitted during planning.
pub trait DiagnosticSink: fmt::Debug + Send + Sync {
    /// Records one diagnostic.
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

/// Keeps diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

/// Context passed into every planning call.
#[derive(Debug, Clone)]
pub struct PlanContext {
    cancel: CancellationToken,
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostic {
    /// Creates a warning about a resource.
    #[must_use]
    pub fn warning(identity: &ResourceIdentity, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            identity: Some(identity.clone()),
            message: message.into(),
        }
    }

    /// Creates an informational note not tied to a resource.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            identity: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identity {
            Some(identity) => write!(f, "{identity}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Info => info!("{diagnostic}"),
            Severity::Warning => warn!("{diagnostic}"),
        }
    }
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}

impl PlanContext {
    /// Creates a context with a fresh cancellation token and a tracing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::with_parts(CancellationToken::new(), Arc::new(TracingSink))
    }

    /// Creates a context from an existing token and sink.
    #[must_use]
    pub fn with_parts(cancel: CancellationToken, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { cancel, sink }
    }

    /// Replaces the diagnostics sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Requests cancellation of the planning call.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emits a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.sink.emit(diagnostic);
    }
}

impl Default for PlanContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = Arc::new(CollectingSink::new());
        let ctx = PlanContext::new().with_sink(sink.clone());

        ctx.emit(Diagnostic::info("first"));
        ctx.emit(Diagnostic::warning(
            &ResourceIdentity::new("VM", "vm-1", "acme", "core"),
            "second",
        ));

        let collected = sink.diagnostics();
        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].message, "first");
        assert_eq!(collected[1].to_string(), "VM/acme/core/vm-1: second");
    }

    #[test]
    fn test_cancel_is_visible_through_clones() {
        let ctx = PlanContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
    }
}
