//! Change set assembly.
//!
//! Classifies every identity in desired ∪ actual on blocking worker tasks,
//! merges the results once all workers are done, then orders them with the
//! dependency graph.

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{ClassificationError, PlanError};
use crate::provider::ProviderRegistry;
use crate::resource::{DesiredResource, ResourceIdentity};
use crate::state::ActualResource;

use super::compare::ResourceComparator;
use super::context::{Diagnostic, PlanContext};
use super::graph::DependencyGraph;
use super::plan::{Change, ChangeSet, ChangeType, StackRef};

type Classified = (ResourceIdentity, Result<Option<Change>, ClassificationError>);

/// Desired and actual resources keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct PlanInput {
    desired: BTreeMap<ResourceIdentity, DesiredResource>,
    actual: BTreeMap<ResourceIdentity, ActualResource>,
}

/// Result of a planning call that was not aborted.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// The change set, partial when `errors` is not empty.
    pub change_set: ChangeSet,
    /// Resources that could not be classified, in identity order.
    pub errors: Vec<ClassificationError>,
}

/// Builds change sets from a [`PlanInput`].
#[derive(Debug, Clone)]
pub struct ChangeSetBuilder {
    registry: Arc<ProviderRegistry>,
    stack: StackRef,
    desired_hash: String,
    parallelism: usize,
}

impl PlanInput {
    /// Keys both collections by identity.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DuplicateIdentity`] if either side holds two
    /// resources with the same identity.
    pub fn new(desired: Vec<DesiredResource>, actual: Vec<ActualResource>) -> Result<Self, PlanError> {
        let mut input = Self::default();

        for resource in desired {
            if let Some(previous) = input.desired.insert(resource.identity.clone(), resource) {
                return Err(PlanError::DuplicateIdentity {
                    side: "desired",
                    identity: previous.identity.to_string(),
                });
            }
        }

        for resource in actual {
            if let Some(previous) = input.actual.insert(resource.identity.clone(), resource) {
                return Err(PlanError::DuplicateIdentity {
                    side: "actual",
                    identity: previous.identity.to_string(),
                });
            }
        }

        Ok(input)
    }

    /// Desired resources by identity.
    #[must_use]
    pub const fn desired(&self) -> &BTreeMap<ResourceIdentity, DesiredResource> {
        &self.desired
    }

    /// Actual resources by identity.
    #[must_use]
    pub const fn actual(&self) -> &BTreeMap<ResourceIdentity, ActualResource> {
        &self.actual
    }

    /// Every identity seen on either side, sorted.
    #[must_use]
    pub fn identities(&self) -> Vec<ResourceIdentity> {
        let union: BTreeSet<&ResourceIdentity> = self.desired.keys().chain(self.actual.keys()).collect();
        union.into_iter().cloned().collect()
    }

    /// Dependencies of an identity: declared ones if desired, otherwise the
    /// ones recorded in state.
    fn dependencies_of(&self, identity: &ResourceIdentity) -> &[ResourceIdentity] {
        match (self.desired.get(identity), self.actual.get(identity)) {
            (Some(desired), _) => &desired.depends_on,
            (None, Some(actual)) => &actual.depends_on,
            (None, None) => &[],
        }
    }

    /// Builds the dependency graph over desired ∪ actual.
    ///
    /// References to identities that exist on neither side are dropped
    /// with a warning.
    #[must_use]
    pub fn dependency_graph(&self) -> (DependencyGraph, Vec<Diagnostic>) {
        let mut graph = DependencyGraph::new();
        let mut diagnostics = Vec::new();
        let identities = self.identities();

        for identity in &identities {
            graph.add_node(identity.clone());
        }

        for identity in &identities {
            for dependency in self.dependencies_of(identity) {
                if self.desired.contains_key(dependency) || self.actual.contains_key(dependency) {
                    graph.add_edge(identity.clone(), dependency.clone());
                } else {
                    diagnostics.push(Diagnostic::warning(
                        identity,
                        format!("depends on {dependency}, which is neither declared nor deployed; ignoring"),
                    ));
                }
            }
        }

        (graph, diagnostics)
    }
}

impl PlanOutcome {
    /// Returns true if every resource was classified.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ChangeSetBuilder {
    /// Creates a builder using all available parallelism.
    #[must_use]
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let parallelism = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self {
            registry,
            stack: StackRef::default(),
            desired_hash: String::new(),
            parallelism,
        }
    }

    /// Sets the stack identifiers stamped on the change set.
    #[must_use]
    pub fn with_stack(mut self, stack: StackRef) -> Self {
        self.stack = stack;
        self
    }

    /// Sets the desired-state hash stamped on the change set.
    #[must_use]
    pub fn with_desired_hash(mut self, hash: impl Into<String>) -> Self {
        self.desired_hash = hash.into();
        self
    }

    /// Caps the number of comparison workers (at least one).
    #[must_use]
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    /// Computes the change set.
    ///
    /// Per-resource classification errors are returned inside the outcome
    /// next to the partial change set. No change set is returned on a
    /// cycle or on cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DependencyCycle`] if the dependency graph has a
    /// cycle, [`PlanError::Cancelled`] if the context was cancelled, and
    /// [`PlanError::WorkerFailed`] if a worker panicked.
    pub async fn build(&self, ctx: &PlanContext, input: PlanInput) -> Result<PlanOutcome, PlanError> {
        if ctx.is_cancelled() {
            return Err(PlanError::Cancelled);
        }

        let (graph, mut diagnostics) = input.dependency_graph();
        if let Some(cycle) = graph.find_cycle() {
            return Err(PlanError::cycle(&cycle));
        }

        let identities = input.identities();
        info!(
            "Planning {} resource(s): {} desired, {} deployed",
            identities.len(),
            input.desired.len(),
            input.actual.len()
        );

        let input = Arc::new(input);
        let classified = self.classify(ctx, &input, identities).await?;

        let mut changes: BTreeMap<ResourceIdentity, Change> = BTreeMap::new();
        let mut errors = Vec::new();
        let mut no_change = 0;
        for (identity, outcome) in classified {
            match outcome {
                Ok(Some(change)) if change.change_type == ChangeType::NoChange => no_change += 1,
                Ok(Some(change)) => {
                    changes.insert(identity, change);
                }
                Ok(None) => {}
                Err(error) => errors.push(error),
            }
        }

        diagnostics.extend(deletion_hazards(&input, &changes));
        let ordered = execution_order(&graph, changes)?;

        for diagnostic in diagnostics {
            ctx.emit(diagnostic);
        }
        for error in &errors {
            ctx.emit(Diagnostic::warning(error.identity(), error.to_string()));
        }

        let change_set = ChangeSet::new(self.stack.clone(), self.desired_hash.clone(), ordered, no_change);
        let summary = change_set.summary();
        info!(
            "Plan: {} to create, {} to update, {} to recreate, {} to delete, {} unchanged",
            summary.create, summary.update, summary.recreate, summary.delete, summary.no_change
        );

        Ok(PlanOutcome { change_set, errors })
    }

    async fn classify(
        &self,
        ctx: &PlanContext,
        input: &Arc<PlanInput>,
        identities: Vec<ResourceIdentity>,
    ) -> Result<Vec<Classified>, PlanError> {
        let chunk_size = identities.len().div_ceil(self.parallelism).max(1);
        let mut workers: JoinSet<Option<Vec<Classified>>> = JoinSet::new();

        for chunk in identities.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let input = Arc::clone(input);
            let registry = Arc::clone(&self.registry);
            let token = ctx.cancellation().clone();

            workers.spawn_blocking(move || {
                let comparator = ResourceComparator::new(&registry);
                let mut results = Vec::with_capacity(chunk.len());
                for identity in chunk {
                    if token.is_cancelled() {
                        return None;
                    }
                    let outcome = comparator.compare(
                        &identity,
                        input.desired.get(&identity),
                        input.actual.get(&identity),
                    );
                    results.push((identity, outcome));
                }
                Some(results)
            });
        }
        debug!("Spawned {} comparison worker(s)", workers.len());

        let collect = async {
            let mut merged = Vec::new();
            while let Some(joined) = workers.join_next().await {
                let chunk = joined.map_err(|e| PlanError::WorkerFailed {
                    message: e.to_string(),
                })?;
                let Some(chunk) = chunk else {
                    return Err(PlanError::Cancelled);
                };
                merged.extend(chunk);
            }
            Ok::<_, PlanError>(merged)
        };

        let mut merged = tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => return Err(PlanError::Cancelled),
            merged = collect => merged?,
        };

        if ctx.is_cancelled() {
            return Err(PlanError::Cancelled);
        }

        merged.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(merged)
    }
}

/// Warns about declared resources that depend on something being deleted.
fn deletion_hazards(input: &PlanInput, changes: &BTreeMap<ResourceIdentity, Change>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (identity, desired) in &input.desired {
        for dependency in &desired.depends_on {
            let deleted = changes
                .get(dependency)
                .is_some_and(|c| c.change_type == ChangeType::Delete);
            if deleted {
                diagnostics.push(Diagnostic::warning(
                    identity,
                    format!("depends on {dependency}, which is scheduled for deletion"),
                ));
            }
        }
    }
    diagnostics
}

/// Constructive changes in dependency order, then deletes in reverse
/// dependency order.
fn execution_order(
    graph: &DependencyGraph,
    mut changes: BTreeMap<ResourceIdentity, Change>,
) -> Result<Vec<Change>, PlanError> {
    let rank = |identity: &ResourceIdentity| {
        changes
            .get(identity)
            .map_or(ChangeType::NoChange, |c| c.change_type)
    };
    let creation = graph.topological_order_by(rank)?;
    let deletion = graph.deletion_order()?;

    let mut constructive = Vec::new();
    for identity in creation {
        if rank(&identity).is_constructive() {
            constructive.push(identity);
        }
    }
    let destructive: Vec<ResourceIdentity> = deletion
        .into_iter()
        .filter(|identity| rank(identity) == ChangeType::Delete)
        .collect();

    let mut ordered = Vec::with_capacity(changes.len());
    for identity in constructive.iter().chain(&destructive) {
        if let Some(change) = changes.remove(identity) {
            ordered.push(change);
        }
    }
    Ok(ordered)
}
