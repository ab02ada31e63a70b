// src/dag/dot.rs

//! GraphViz export of a dependency graph, colored by phase.

use std::fs;
use std::path::Path;

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use tracing::debug;

use crate::dag::{DependencyGraph, NodeIndex};
use crate::errors::Result;

const PHASE_COLORS: [&str; 8] = [
    "red", "blue", "green", "pink", "purple", "gold", "black", "cyan",
];

/// Color used for nodes of `phase`; colors repeat after eight phases.
pub fn phase_color(phase: usize) -> &'static str {
    PHASE_COLORS[phase % PHASE_COLORS.len()]
}

/// Render `graph` as a DOT digraph. Edges point from dependency to
/// dependent; `label` names each node and `phase_of` picks its color.
pub fn to_dot<T, L, P>(graph: &DependencyGraph<T>, label: L, phase_of: P) -> String
where
    L: Fn(NodeIndex, &T) -> String,
    P: Fn(NodeIndex) -> usize,
{
    let mut view: DiGraph<(String, usize), ()> =
        DiGraph::with_capacity(graph.len(), graph.edge_count());
    let ids: Vec<_> = graph
        .iter()
        .map(|(index, node)| view.add_node((label(index, node.payload()), phase_of(index))))
        .collect();
    for (index, node) in graph.iter() {
        for dep in node.dependencies() {
            view.add_edge(ids[dep], ids[index], ());
        }
    }

    let dot = Dot::with_attr_getters(
        &view,
        &[Config::EdgeNoLabel, Config::NodeNoLabel],
        &|_, _| String::new(),
        &|_, (_, (text, phase))| {
            format!(
                "label = \"{}\" color = \"{}\"",
                text.replace('"', "\\\""),
                phase_color(*phase)
            )
        },
    );
    format!("{dot:?}")
}

/// Write [`to_dot`] output to `path`.
pub fn write_dot<T, L, P>(
    graph: &DependencyGraph<T>,
    label: L,
    phase_of: P,
    path: &Path,
) -> Result<()>
where
    L: Fn(NodeIndex, &T) -> String,
    P: Fn(NodeIndex) -> usize,
{
    let dot = to_dot(graph, label, phase_of);
    fs::write(path, dot)?;
    debug!(path = %path.display(), nodes = graph.len(), "dependency graph written as DOT");
    Ok(())
}
