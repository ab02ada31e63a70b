// src/model/mod.rs

//! The model side of the engine: node/port identity and the [`FactorModel`]
//! trait that schedule entries are executed against.
//!
//! - [`message_graph`] holds [`MessageGraph`], a small deterministic
//!   message-passing model used by the CLI and the test-suite.

pub mod message_graph;

use std::fmt;

use crate::schedule::{Schedule, ScheduleEntry};

pub use message_graph::MessageGraph;

/// Identity of a model node (factor or variable). Also selects the per-node
/// lock held while an entry touching the node is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Incoming message slot of `node` along its `index`-th sibling edge.
///
/// `Port(n, i)` is read by updates of `n` and written by updates of the
/// `i`-th sibling of `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Port {
    pub node: NodeId,
    pub index: usize,
}

impl Port {
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.index)
    }
}

/// The model an execution engine drives.
///
/// `update` is called concurrently from worker threads, so implementations
/// keep their message storage behind interior mutability. The engine
/// guarantees that conflicting entries are ordered by the dependency graph
/// and that no two entries touching the same node run at the same time.
pub trait FactorModel: Sync {
    /// Identity of this model instance, distinct from every other live
    /// model. Cached graphs are keyed on it together with the versions.
    fn model_id(&self) -> u64;

    /// Number of nodes; node ids are `0..node_count()`.
    fn node_count(&self) -> usize;

    /// Neighbours of `node`, in port order.
    fn siblings(&self, node: NodeId) -> &[NodeId];

    /// Port index of `sibling` within `node`'s sibling list.
    fn port_num(&self, node: NodeId, sibling: NodeId) -> Option<usize>;

    /// Bumped whenever nodes or edges change.
    fn structure_version(&self) -> u64;

    /// The per-iteration schedule.
    fn schedule(&self) -> &Schedule;

    /// Bumped whenever the schedule changes.
    fn schedule_version(&self) -> u64;

    /// Perform the numeric work of one schedule entry.
    fn update(&self, entry: &ScheduleEntry) -> anyhow::Result<()>;

    /// Human-readable node name for logs and DOT output.
    fn node_name(&self, node: NodeId) -> String {
        node.to_string()
    }

    /// The port on the far side of `node`'s `index`-th edge, i.e. the port an
    /// update of `node` writes when it produces that edge's outgoing message.
    fn reverse_port(&self, node: NodeId, index: usize) -> Option<Port> {
        let sibling = *self.siblings(node).get(index)?;
        let back = self.port_num(sibling, node)?;
        Some(Port::new(sibling, back))
    }
}
