// src/dag/verify.rs

//! Ordering checks for built dependency graphs.
//!
//! These walk a finished graph and confirm the guarantees the builders are
//! supposed to give. They are used by `--verify` and by the test-suite.

use std::collections::HashMap;

use thiserror::Error;

use crate::dag::{DependencyGraph, NodeIndex};
use crate::model::{FactorModel, Port};
use crate::schedule::ScheduleEntry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphViolation {
    #[error("dependency graph contains a cycle")]
    Cycle,

    /// `reader` reads `port` but does not (transitively) wait for the node
    /// that last wrote it before `reader` in build order.
    #[error("node {reader} reads {port} without waiting for its writer {writer}")]
    UnorderedRead {
        reader: NodeIndex,
        writer: NodeIndex,
        port: Port,
    },

    /// Two nodes writing the same port have no ordering between them.
    #[error("nodes {first} and {second} both write {port} without ordering")]
    UnorderedWrite {
        first: NodeIndex,
        second: NodeIndex,
        port: Port,
    },

    #[error("node {second} in phase {phase} does not run after its dependency {first}")]
    PhaseConflict {
        first: NodeIndex,
        second: NodeIndex,
        phase: usize,
    },

    #[error("node {index} is missing from the phase list")]
    MissingFromPhases { index: NodeIndex },

    #[error("node {index} cannot be resolved against the model: {reason}")]
    Unresolved { index: NodeIndex, reason: String },
}

/// Check acyclicity, read-after-write ordering, and write-after-write
/// ordering of `graph`, assuming node indices follow build order.
pub fn verify_ordering<M: FactorModel + ?Sized>(
    model: &M,
    graph: &DependencyGraph<ScheduleEntry>,
) -> Result<(), GraphViolation> {
    if !graph.is_acyclic() {
        return Err(GraphViolation::Cycle);
    }

    let mut last_writer: HashMap<Port, NodeIndex> = HashMap::new();
    for (index, node) in graph.iter() {
        let access = node
            .payload()
            .touched_ports(model)
            .map_err(|e| GraphViolation::Unresolved {
                index,
                reason: e.to_string(),
            })?;
        let ancestors = graph.transitive_dependencies(index);

        for port in &access.reads {
            if let Some(&writer) = last_writer.get(port)
                && writer != index
                && !ancestors.contains(&writer)
            {
                return Err(GraphViolation::UnorderedRead {
                    reader: index,
                    writer,
                    port: *port,
                });
            }
        }
        for port in &access.writes {
            if let Some(&writer) = last_writer.get(port)
                && writer != index
                && !ancestors.contains(&writer)
            {
                return Err(GraphViolation::UnorderedWrite {
                    first: writer,
                    second: index,
                    port: *port,
                });
            }
        }
        for port in access.writes {
            last_writer.insert(port, index);
        }
    }
    Ok(())
}

/// Check that `phases` covers every node and never puts two dependent
/// nodes in the same phase.
pub fn verify_phases<T>(
    graph: &DependencyGraph<T>,
    phases: &[Vec<NodeIndex>],
) -> Result<(), GraphViolation> {
    let mut phase_of = vec![None; graph.len()];
    for (phase, members) in phases.iter().enumerate() {
        for &index in members {
            phase_of[index] = Some(phase);
        }
    }

    for (index, node) in graph.iter() {
        let Some(phase) = phase_of[index] else {
            return Err(GraphViolation::MissingFromPhases { index });
        };
        for dep in node.dependencies() {
            if phase_of[dep].is_some_and(|p| p >= phase) {
                return Err(GraphViolation::PhaseConflict {
                    first: dep,
                    second: index,
                    phase,
                });
            }
        }
    }
    Ok(())
}
