// src/dag/graph.rs

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use crate::dag::node::DependencyGraphNode;
use crate::dag::NodeIndex;

/// Append-only dependency graph over payloads of type `T`.
///
/// Nodes are addressed by the index returned from [`add`](Self::add); that
/// index never changes. The graph keeps its root list (no dependencies) and
/// leaf list (no dependents) up to date as edges are added and removed.
///
/// Structural edits need `&mut self`; the per-run completion flags use
/// atomics so engines can share the graph by reference across workers.
#[derive(Debug)]
pub struct DependencyGraph<T> {
    nodes: Vec<DependencyGraphNode<T>>,
    roots: BTreeSet<NodeIndex>,
    leaves: BTreeSet<NodeIndex>,
    completed: Vec<AtomicBool>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DependencyGraph<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: BTreeSet::new(),
            leaves: BTreeSet::new(),
            completed: Vec::new(),
        }
    }

    /// Append a node with no edges and return its index.
    ///
    /// A fresh node is both a root and a leaf.
    pub fn add(&mut self, payload: T) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(DependencyGraphNode::new(payload));
        self.completed.push(AtomicBool::new(false));
        self.roots.insert(index);
        self.leaves.insert(index);
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: NodeIndex) -> &DependencyGraphNode<T> {
        &self.nodes[index]
    }

    pub fn payload(&self, index: NodeIndex) -> &T {
        self.nodes[index].payload()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeIndex, &DependencyGraphNode<T>)> {
        self.nodes.iter().enumerate()
    }

    /// Nodes with no dependencies, in index order.
    pub fn roots(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.roots.iter().copied()
    }

    /// Nodes with no dependents, in index order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.leaves.iter().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.dependency_count()).sum()
    }

    /// Make `dependent` wait for `dependency`. Returns `false` if the edge
    /// already existed.
    ///
    /// # Panics
    ///
    /// On a self-edge, an out-of-range index, or (debug builds) an edge that
    /// would close a cycle.
    pub fn add_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) -> bool {
        assert!(
            dependent < self.nodes.len() && dependency < self.nodes.len(),
            "dependency edge {dependent} -> {dependency} refers to a node outside the graph"
        );
        assert_ne!(dependent, dependency, "node {dependent} cannot depend on itself");
        debug_assert!(
            !self.depends_on(dependency, dependent),
            "edge {dependent} -> {dependency} would create a cycle"
        );

        if !self.nodes[dependent].insert_dependency(dependency) {
            return false;
        }
        self.nodes[dependency].insert_dependent(dependent);
        self.roots.remove(&dependent);
        self.leaves.remove(&dependency);
        true
    }

    /// Add several dependencies at once; returns how many were new.
    pub fn add_dependencies<I>(&mut self, dependent: NodeIndex, dependencies: I) -> usize
    where
        I: IntoIterator<Item = NodeIndex>,
    {
        dependencies
            .into_iter()
            .filter(|&dep| self.add_dependency(dependent, dep))
            .count()
    }

    /// Inverse of [`add_dependency`](Self::add_dependency). Returns `false`
    /// if there was no such edge.
    pub fn remove_dependency(&mut self, dependent: NodeIndex, dependency: NodeIndex) -> bool {
        if !self.nodes[dependent].remove_dependency(dependency) {
            return false;
        }
        self.nodes[dependency].remove_dependent(dependent);
        if self.nodes[dependent].is_root() {
            self.roots.insert(dependent);
        }
        if self.nodes[dependency].is_leaf() {
            self.leaves.insert(dependency);
        }
        true
    }

    /// Replace the direct edge `dependent -> dependency` with
    /// `dependent -> intermediary -> dependency`.
    pub fn insert_dependency(
        &mut self,
        dependent: NodeIndex,
        intermediary: NodeIndex,
        dependency: NodeIndex,
    ) {
        self.remove_dependency(dependent, dependency);
        self.add_dependency(intermediary, dependency);
        self.add_dependency(dependent, intermediary);
    }

    /// Whether `from` transitively depends on `to`.
    pub fn depends_on(&self, from: NodeIndex, to: NodeIndex) -> bool {
        if from == to {
            return false;
        }
        let mut stack = vec![from];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(index) = stack.pop() {
            for dep in self.nodes[index].dependencies() {
                if dep == to {
                    return true;
                }
                if !seen[dep] {
                    seen[dep] = true;
                    stack.push(dep);
                }
            }
        }
        false
    }

    /// Every node `index` transitively depends on.
    pub fn transitive_dependencies(&self, index: NodeIndex) -> BTreeSet<NodeIndex> {
        let mut out = BTreeSet::new();
        let mut stack = vec![index];
        while let Some(i) = stack.pop() {
            for dep in self.nodes[i].dependencies() {
                if out.insert(dep) {
                    stack.push(dep);
                }
            }
        }
        out
    }

    /// Edge view for petgraph: one graph node per index, edges run from
    /// dependency to dependent.
    pub fn to_petgraph(&self) -> DiGraph<NodeIndex, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edge_count());
        let ids: Vec<_> = (0..self.nodes.len()).map(|i| graph.add_node(i)).collect();
        for (index, node) in self.iter() {
            for dep in node.dependencies() {
                graph.add_edge(ids[dep], ids[index], ());
            }
        }
        graph
    }

    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.to_petgraph())
    }

    /// Clear every completion flag before a fresh traversal.
    pub fn initialize(&self) {
        for flag in &self.completed {
            flag.store(false, Ordering::Release);
        }
    }

    /// Mark a node completed; returns `false` if it already was.
    pub fn mark_completed(&self, index: NodeIndex) -> bool {
        !self.completed[index].swap(true, Ordering::AcqRel)
    }

    pub fn is_completed(&self, index: NodeIndex) -> bool {
        self.completed[index].load(Ordering::Acquire)
    }

    /// Whether every direct dependency of `index` has completed.
    pub fn all_dependencies_met(&self, index: NodeIndex) -> bool {
        self.nodes[index]
            .dependencies()
            .all(|dep| self.is_completed(dep))
    }

    pub fn completed_count(&self) -> usize {
        self.completed
            .iter()
            .filter(|f| f.load(Ordering::Acquire))
            .count()
    }
}
