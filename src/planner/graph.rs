//! Dependency graph over resource identities.
//!
//! An edge `A -> B` means A declares a dependency on B: B must exist before
//! A is created, and A must be gone before B is destroyed.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::PlanError;
use crate::resource::ResourceIdentity;

/// Directed graph of declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Node -> identities it depends on.
    dependencies: BTreeMap<ResourceIdentity, BTreeSet<ResourceIdentity>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

#[derive(Clone, Copy)]
enum Direction {
    /// Dependencies before dependents.
    Creation,
    /// Dependents before dependencies.
    Deletion,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dependencies: BTreeMap::new(),
        }
    }

    /// Adds a node with no edges (no-op if present).
    pub fn add_node(&mut self, identity: ResourceIdentity) {
        self.dependencies.entry(identity).or_default();
    }

    /// Adds an edge: `dependent` depends on `dependency`.
    pub fn add_edge(&mut self, dependent: ResourceIdentity, dependency: ResourceIdentity) {
        self.add_node(dependency.clone());
        self.dependencies.entry(dependent).or_default().insert(dependency);
    }

    /// Returns true if the identity is a node of the graph.
    #[must_use]
    pub fn contains(&self, identity: &ResourceIdentity) -> bool {
        self.dependencies.contains_key(identity)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.dependencies.values().map(BTreeSet::len).sum()
    }

    /// Direct dependencies of a node, sorted.
    pub fn dependencies_of(&self, identity: &ResourceIdentity) -> impl Iterator<Item = &ResourceIdentity> {
        self.dependencies.get(identity).into_iter().flatten()
    }

    /// Returns a creation-safe order: every dependency precedes its
    /// dependents. Unrelated nodes are ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DependencyCycle`] if the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<ResourceIdentity>, PlanError> {
        self.topological_order_by(|_| ())
    }

    /// Like [`Self::topological_order`], breaking ties first by `rank`, then
    /// by identity.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DependencyCycle`] if the graph has a cycle.
    pub fn topological_order_by<K: Ord>(
        &self,
        rank: impl Fn(&ResourceIdentity) -> K,
    ) -> Result<Vec<ResourceIdentity>, PlanError> {
        self.kahn(Direction::Creation, rank)
    }

    /// Returns a deletion-safe order: every dependent precedes the resources
    /// it depends on. Unrelated nodes are ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::DependencyCycle`] if the graph has a cycle.
    pub fn deletion_order(&self) -> Result<Vec<ResourceIdentity>, PlanError> {
        self.kahn(Direction::Deletion, |_| ())
    }

    /// Finds a cycle, returned as the path with its first node repeated at
    /// the end (`a -> b -> a`).
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<ResourceIdentity>> {
        let mut marks: BTreeMap<&ResourceIdentity, Mark> = BTreeMap::new();

        for start in self.dependencies.keys() {
            if marks.contains_key(start) {
                continue;
            }

            // Explicit DFS stack; the frames double as the current path.
            marks.insert(start, Mark::InProgress);
            let mut stack = vec![(start, self.dependencies_of(start))];

            while let Some((node, dependencies)) = stack.last_mut() {
                let node = *node;
                let Some(dependency) = dependencies.next() else {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    continue;
                };

                match marks.get(dependency) {
                    Some(Mark::InProgress) => {
                        let from = stack
                            .iter()
                            .position(|(n, _)| *n == dependency)
                            .unwrap_or(0);
                        let mut cycle: Vec<ResourceIdentity> =
                            stack[from..].iter().map(|(n, _)| (*n).clone()).collect();
                        cycle.push(dependency.clone());
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(dependency, Mark::InProgress);
                        stack.push((dependency, self.dependencies_of(dependency)));
                    }
                }
            }
        }
        None
    }

    fn kahn<K: Ord>(
        &self,
        direction: Direction,
        rank: impl Fn(&ResourceIdentity) -> K,
    ) -> Result<Vec<ResourceIdentity>, PlanError> {
        let mut dependents: BTreeMap<&ResourceIdentity, Vec<&ResourceIdentity>> = BTreeMap::new();
        for (node, dependencies) in &self.dependencies {
            for dependency in dependencies {
                dependents.entry(dependency).or_default().push(node);
            }
        }

        // Number of nodes that must be emitted before each node is ready.
        let mut pending: BTreeMap<&ResourceIdentity, usize> = self
            .dependencies
            .iter()
            .map(|(node, dependencies)| {
                let blockers = match direction {
                    Direction::Creation => dependencies.len(),
                    Direction::Deletion => dependents.get(node).map_or(0, Vec::len),
                };
                (node, blockers)
            })
            .collect();

        let mut ready: BTreeSet<(K, &ResourceIdentity)> = pending
            .iter()
            .filter(|(_, blockers)| **blockers == 0)
            .map(|(node, _)| (rank(node), *node))
            .collect();

        let mut order = Vec::with_capacity(self.dependencies.len());
        while let Some((_, node)) = ready.pop_first() {
            order.push(node.clone());

            let unblocked: Vec<&ResourceIdentity> = match direction {
                Direction::Creation => dependents.get(node).cloned().unwrap_or_default(),
                Direction::Deletion => self.dependencies_of(node).collect(),
            };
            for next in unblocked {
                if let Some(blockers) = pending.get_mut(next) {
                    *blockers -= 1;
                    if *blockers == 0 {
                        ready.insert((rank(next), next));
                    }
                }
            }
        }

        if order.len() == self.dependencies.len() {
            return Ok(order);
        }

        let cycle = self.find_cycle().unwrap_or_else(|| {
            let emitted: BTreeSet<&ResourceIdentity> = order.iter().collect();
            self.dependencies
                .keys()
                .filter(|node| !emitted.contains(node))
                .cloned()
                .collect()
        });
        Err(PlanError::cycle(&cycle))
    }
}
