//! Reconciler tying configuration, state and planning together.
//!
//! This module loads the recorded state through a [`StateStore`], converts
//! the stack document into desired resources and runs the change planner
//! over both.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{ConfigHasher, StackConfig};
use crate::error::{ClassificationError, Result, StateError};
use crate::planner::{
    Change, ChangeSet, ChangeSetBuilder, ChangeType, DependencyGraph, Diagnostic, PlanContext,
    PlanInput, Violation,
};
use crate::provider::ProviderRegistry;
use crate::state::{StateSnapshot, StateStore};

/// Reconciler for one stack document.
pub struct Reconciler<'a, S: StateStore> {
    /// Configuration.
    config: &'a StackConfig,
    /// State store.
    state_store: &'a S,
    /// Kind capabilities.
    registry: Arc<ProviderRegistry>,
    /// Configuration hasher.
    hasher: ConfigHasher,
    /// Worker cap for the planner.
    parallelism: Option<usize>,
}

/// Result of a planning run.
#[derive(Debug, Serialize)]
pub struct PlanReport {
    /// The computed change set, partial when `errors` is not empty.
    pub change_set: ChangeSet,
    /// Resources that could not be classified.
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<ClassificationError>,
    /// Guardrails the plan breaks.
    pub violations: Vec<Violation>,
}

/// Resources whose recorded state differs from their declaration.
#[derive(Debug, Serialize)]
pub struct DriftReport {
    /// Stack name.
    pub stack: String,
    /// Environment name.
    pub environment: String,
    /// Number of resources both declared and deployed.
    pub checked: usize,
    /// Updates and recreates, in execution order.
    pub drifted: Vec<Change>,
    /// Resources that could not be classified.
    #[serde(serialize_with = "serialize_errors")]
    pub errors: Vec<ClassificationError>,
}

impl<'a, S: StateStore> Reconciler<'a, S> {
    /// Creates a new reconciler using the kinds the document registers.
    #[must_use]
    pub fn new(config: &'a StackConfig, state_store: &'a S) -> Self {
        Self {
            config,
            state_store,
            registry: Arc::new(config.registry()),
            hasher: ConfigHasher::new(),
            parallelism: None,
        }
    }

    /// Replaces the provider registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Caps the number of comparison workers.
    #[must_use]
    pub const fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = Some(workers);
        self
    }

    /// Loads the recorded snapshot, or an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the snapshot belongs to a
    /// different stack or environment.
    pub async fn load_snapshot(&self) -> Result<StateSnapshot> {
        let stack = &self.config.stack;
        let Some(snapshot) = self.state_store.load().await? else {
            info!(
                "No recorded state for {}/{}, planning from scratch",
                stack.name, stack.environment
            );
            return Ok(StateSnapshot::new(&stack.name, &stack.environment, &stack.tenant));
        };

        if snapshot.stack != stack.name || snapshot.environment != stack.environment {
            return Err(StateError::StackMismatch {
                expected: format!("{}/{}", stack.name, stack.environment),
                found: snapshot.stack_label(),
            }
            .into());
        }

        debug!("Loaded {} recorded resource(s)", snapshot.resources.len());
        Ok(snapshot)
    }

    /// Builds the planner input and the desired-state hash.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or either side holds a
    /// duplicate identity.
    pub async fn plan_input(&self) -> Result<(PlanInput, String)> {
        let snapshot = self.load_snapshot().await?;
        let desired = self.config.desired_resources(&self.registry);
        let hash = self.hasher.hash_desired(&desired);
        let input = PlanInput::new(desired, snapshot.resources)?;
        Ok((input, hash))
    }

    /// Computes the change set and checks it against the guardrails.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded, the dependency graph
    /// has a cycle, or planning is cancelled.
    pub async fn plan(&self, ctx: &PlanContext) -> Result<PlanReport> {
        info!(
            "Planning {}/{}",
            self.config.stack.name, self.config.stack.environment
        );

        let (input, hash) = self.plan_input().await?;
        let outcome = self.builder(hash).build(ctx, input).await?;

        let violations = self.config.guardrails().check(&outcome.change_set);
        for violation in &violations {
            warn!("Guardrail violated: {violation}");
        }

        Ok(PlanReport {
            change_set: outcome.change_set,
            errors: outcome.errors,
            violations,
        })
    }

    /// Reports resources whose recorded state differs from the declaration.
    ///
    /// # Errors
    ///
    /// Same as [`Self::plan`].
    pub async fn drift(&self, ctx: &PlanContext) -> Result<DriftReport> {
        let (input, hash) = self.plan_input().await?;
        let checked = input
            .desired()
            .keys()
            .filter(|identity| input.actual().contains_key(*identity))
            .count();

        let outcome = self.builder(hash).build(ctx, input).await?;
        let drifted: Vec<Change> = outcome
            .change_set
            .changes()
            .iter()
            .filter(|c| matches!(c.change_type, ChangeType::Update | ChangeType::Recreate))
            .cloned()
            .collect();

        info!("{} of {checked} deployed resource(s) drifted", drifted.len());
        Ok(DriftReport {
            stack: self.config.stack.name.clone(),
            environment: self.config.stack.environment.clone(),
            checked,
            drifted,
            errors: outcome.errors,
        })
    }

    /// Dependency graph over declared and recorded resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded or holds duplicates.
    pub async fn dependency_graph(&self) -> Result<(DependencyGraph, Vec<Diagnostic>)> {
        let (input, _) = self.plan_input().await?;
        Ok(input.dependency_graph())
    }

    fn builder(&self, hash: String) -> ChangeSetBuilder {
        let builder = ChangeSetBuilder::new(Arc::clone(&self.registry))
            .with_stack(self.config.stack_ref())
            .with_desired_hash(hash);
        match self.parallelism {
            Some(workers) => builder.with_parallelism(workers),
            None => builder,
        }
    }
}

impl PlanReport {
    /// Returns true if the plan breaks no guardrail.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.violations.is_empty()
    }
}

impl DriftReport {
    /// Returns true if any deployed resource differs from its declaration.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.drifted.is_empty()
    }
}

fn serialize_errors<S: Serializer>(
    errors: &[ClassificationError],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
