// src/dag/node.rs

//! A single node of a [`DependencyGraph`](crate::dag::DependencyGraph).

use std::collections::BTreeSet;

use crate::dag::NodeIndex;

/// Payload plus the indices of its direct dependencies and dependents.
///
/// Edges are stored as arena indices into the owning graph; per-run state
/// (completion flags, counters) lives in parallel arrays on the graph, not
/// here, so workers only ever read a node.
#[derive(Debug, Clone)]
pub struct DependencyGraphNode<T> {
    payload: T,
    /// Nodes that must complete before this one may run.
    dependencies: BTreeSet<NodeIndex>,
    /// Nodes that wait on this one.
    dependents: BTreeSet<NodeIndex>,
}

impl<T> DependencyGraphNode<T> {
    pub(crate) fn new(payload: T) -> Self {
        Self {
            payload,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn dependencies(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.dependencies.iter().copied()
    }

    pub fn dependents(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.dependents.iter().copied()
    }

    pub fn has_dependency(&self, index: NodeIndex) -> bool {
        self.dependencies.contains(&index)
    }

    pub fn has_dependent(&self, index: NodeIndex) -> bool {
        self.dependents.contains(&index)
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// No dependencies.
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// No dependents.
    pub fn is_leaf(&self) -> bool {
        self.dependents.is_empty()
    }

    pub(crate) fn insert_dependency(&mut self, index: NodeIndex) -> bool {
        self.dependencies.insert(index)
    }

    pub(crate) fn insert_dependent(&mut self, index: NodeIndex) -> bool {
        self.dependents.insert(index)
    }

    pub(crate) fn remove_dependency(&mut self, index: NodeIndex) -> bool {
        self.dependencies.remove(&index)
    }

    pub(crate) fn remove_dependent(&mut self, index: NodeIndex) -> bool {
        self.dependents.remove(&index)
    }
}
