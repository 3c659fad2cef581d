//! Change planning.
//!
//! This module compares desired resources with the recorded state and
//! produces an ordered, summarized change set. It performs no I/O.

mod builder;
mod compare;
mod context;
mod diff;
mod graph;
mod guardrails;
mod plan;

pub use builder::{ChangeSetBuilder, PlanInput, PlanOutcome};
pub use compare::{ResourceComparator, REASON_CREATE, REASON_DELETE};
pub use context::{CollectingSink, Diagnostic, DiagnosticSink, PlanContext, Severity, TracingSink};
pub use diff::{AttributeChange, AttributeDiffer, SENSITIVE_PLACEHOLDER};
pub use graph::DependencyGraph;
pub use guardrails::{Guardrails, Violation};
pub use plan::{Change, ChangeRecord, ChangeSet, ChangeSummary, ChangeType, StackRef};
