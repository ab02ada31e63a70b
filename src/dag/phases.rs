// src/dag/phases.rs

//! Topological layering of a dependency graph into phases.

use crate::dag::{DependencyGraph, NodeIndex};

/// Split `graph` into phases using Kahn's algorithm with level tracking.
///
/// Phase 0 holds the roots; a node lands in the phase after the last of its
/// dependencies. Nodes inside a phase are in index order, and no node depends
/// on another node of the same phase.
///
/// # Panics
///
/// If the graph has a cycle (some nodes never reach in-degree zero).
pub fn phase_layers<T>(graph: &DependencyGraph<T>) -> Vec<Vec<NodeIndex>> {
    if graph.is_empty() {
        return Vec::new();
    }

    let mut in_degree: Vec<usize> = graph.iter().map(|(_, n)| n.dependency_count()).collect();
    let mut current: Vec<NodeIndex> = graph.roots().collect();
    let mut layers = Vec::new();
    let mut processed = 0;

    while !current.is_empty() {
        current.sort_unstable();
        processed += current.len();

        let mut next = Vec::new();
        for &index in &current {
            for dependent in graph.node(index).dependents() {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }

        layers.push(current);
        current = next;
    }

    assert_eq!(
        processed,
        graph.len(),
        "dependency graph has a cycle; {} nodes could not be layered",
        graph.len() - processed
    );
    layers
}

/// Phase number per node index, derived from [`phase_layers`].
pub fn phase_numbers(layers: &[Vec<NodeIndex>], node_count: usize) -> Vec<usize> {
    let mut out = vec![0; node_count];
    for (phase, layer) in layers.iter().enumerate() {
        for &index in layer {
            out[index] = phase;
        }
    }
    out
}
