// src/schedule/entry.rs

use std::fmt;
use std::sync::Arc;

use crate::errors::{MtschedError, Result};
use crate::model::{FactorModel, NodeId, Port};
use crate::schedule::Schedule;

/// One update operation in a schedule.
///
/// Equality is structural, so the same entry recurring in a later iteration
/// compares equal to its earlier occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleEntry {
    /// Update every outgoing edge of one node.
    Node(NodeId),
    /// Update exactly one outgoing edge of one node.
    Edge { node: NodeId, port: usize },
    /// Jointly update a set of nodes.
    Block(Vec<NodeId>),
    /// A nested schedule, expanded in place.
    SubSchedule(Arc<Schedule>),
}

/// Ports an entry reads and writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortAccess {
    pub reads: Vec<Port>,
    pub writes: Vec<Port>,
}

impl ScheduleEntry {
    pub fn node(node: NodeId) -> Self {
        ScheduleEntry::Node(node)
    }

    pub fn edge(node: NodeId, port: usize) -> Self {
        ScheduleEntry::Edge { node, port }
    }

    pub fn block(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        ScheduleEntry::Block(nodes.into_iter().collect())
    }

    /// Ports this entry reads and writes, resolved against the model
    /// topology.
    ///
    /// - node entry on `n`: reads every `Port(n, i)`, writes the reverse port
    ///   of every edge of `n`
    /// - edge entry on `n` out `k`: reads `Port(n, i)` for `i != k`, writes
    ///   the reverse port of `k`
    /// - block entry: union of its members' node-entry access
    /// - sub-schedule: nothing (builders recurse into it instead)
    pub fn touched_ports<M: FactorModel + ?Sized>(&self, model: &M) -> Result<PortAccess> {
        let mut access = PortAccess::default();
        match self {
            ScheduleEntry::Node(node) => node_access(model, *node, &mut access)?,
            ScheduleEntry::Edge { node, port } => {
                let degree = checked_degree(model, *node)?;
                if *port >= degree {
                    return Err(MtschedError::UnsupportedSchedule(format!(
                        "edge entry {self} refers to port {port} but {node} has {degree} ports"
                    )));
                }
                for index in (0..degree).filter(|i| i != port) {
                    access.reads.push(Port::new(*node, index));
                }
                access.writes.push(reverse(model, *node, *port)?);
            }
            ScheduleEntry::Block(nodes) => {
                for node in nodes {
                    node_access(model, *node, &mut access)?;
                }
            }
            ScheduleEntry::SubSchedule(_) => {}
        }
        Ok(access)
    }

    /// Model nodes whose lock must be held while this entry updates, sorted
    /// and deduplicated.
    pub fn touched_nodes(&self) -> Vec<NodeId> {
        let mut nodes = match self {
            ScheduleEntry::Node(node) => vec![*node],
            ScheduleEntry::Edge { node, .. } => vec![*node],
            ScheduleEntry::Block(nodes) => nodes.clone(),
            ScheduleEntry::SubSchedule(_) => Vec::new(),
        };
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Label using model node names, e.g. `edge(f:1)`.
    pub fn describe<M: FactorModel + ?Sized>(&self, model: &M) -> String {
        match self {
            ScheduleEntry::Node(node) => format!("node({})", model.node_name(*node)),
            ScheduleEntry::Edge { node, port } => {
                format!("edge({}:{port})", model.node_name(*node))
            }
            ScheduleEntry::Block(nodes) => {
                let names: Vec<String> = nodes.iter().map(|n| model.node_name(*n)).collect();
                format!("block[{}]", names.join(","))
            }
            ScheduleEntry::SubSchedule(inner) => format!("subschedule({})", inner.len()),
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleEntry::Node(node) => write!(f, "node({node})"),
            ScheduleEntry::Edge { node, port } => write!(f, "edge({node}:{port})"),
            ScheduleEntry::Block(nodes) => {
                let names: Vec<String> = nodes.iter().map(|n| n.to_string()).collect();
                write!(f, "block[{}]", names.join(","))
            }
            ScheduleEntry::SubSchedule(inner) => write!(f, "subschedule({})", inner.len()),
        }
    }
}

fn checked_degree<M: FactorModel + ?Sized>(model: &M, node: NodeId) -> Result<usize> {
    if node.0 >= model.node_count() {
        return Err(MtschedError::UnknownNode(node.to_string()));
    }
    Ok(model.siblings(node).len())
}

fn reverse<M: FactorModel + ?Sized>(model: &M, node: NodeId, index: usize) -> Result<Port> {
    model.reverse_port(node, index).ok_or_else(|| {
        MtschedError::UnsupportedSchedule(format!(
            "{node} port {index} has no matching port on its sibling"
        ))
    })
}

fn node_access<M: FactorModel + ?Sized>(
    model: &M,
    node: NodeId,
    access: &mut PortAccess,
) -> Result<()> {
    for index in 0..checked_degree(model, node)? {
        access.reads.push(Port::new(node, index));
        access.writes.push(reverse(model, node, index)?);
    }
    Ok(())
}
