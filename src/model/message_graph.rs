// src/model/message_graph.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::bail;
use tracing::debug;

use crate::errors::{MtschedError, Result};
use crate::model::{FactorModel, NodeId, Port};
use crate::schedule::{Schedule, ScheduleEntry};

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// A small message-passing model with one scalar message per port.
///
/// Each node has a bias; the outgoing message on edge `k` of node `n` is
///
/// ```text
/// raw = tanh(bias(n) + 0.5 * sum of in(n, i) for i != k)
/// out = (1 - damping) * raw + damping * previous out
/// ```
///
/// The update rule is deterministic, so a schedule run on any number of
/// workers must end in bit-identical messages when the engine orders every
/// conflicting access.
#[derive(Debug)]
pub struct MessageGraph {
    id: u64,
    names: Vec<String>,
    by_name: HashMap<String, NodeId>,
    bias: Vec<f64>,
    siblings: Vec<Vec<NodeId>>,
    /// `inbox[n][i]` holds the bits of the f64 message at `Port(n, i)`.
    inbox: Vec<Vec<AtomicU64>>,
    damping: f64,
    structure_version: u64,
    schedule: Schedule,
    schedule_version: u64,
    explicit_schedule: bool,
}

impl Default for MessageGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageGraph {
    pub fn new() -> Self {
        Self {
            id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
            names: Vec::new(),
            by_name: HashMap::new(),
            bias: Vec::new(),
            siblings: Vec::new(),
            inbox: Vec::new(),
            damping: 0.0,
            structure_version: 0,
            schedule: Schedule::default(),
            schedule_version: 0,
            explicit_schedule: false,
        }
    }

    /// Add a node and return its id. Names must be unique.
    pub fn add_node(&mut self, name: impl Into<String>, bias: f64) -> Result<NodeId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(MtschedError::ConfigError(format!(
                "node '{name}' already exists"
            )));
        }

        let id = NodeId(self.names.len());
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        self.bias.push(bias);
        self.siblings.push(Vec::new());
        self.inbox.push(Vec::new());
        self.structure_changed();
        Ok(id)
    }

    /// Connect two nodes with an undirected edge. Connecting an already
    /// connected pair is a no-op and returns `false`.
    pub fn connect(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        self.check_node(a)?;
        self.check_node(b)?;
        if a == b {
            return Err(MtschedError::ConfigError(format!(
                "node '{}' cannot be connected to itself",
                self.names[a.0]
            )));
        }
        if self.siblings[a.0].contains(&b) {
            return Ok(false);
        }

        self.siblings[a.0].push(b);
        self.inbox[a.0].push(AtomicU64::new(0f64.to_bits()));
        self.siblings[b.0].push(a);
        self.inbox[b.0].push(AtomicU64::new(0f64.to_bits()));
        self.structure_changed();
        Ok(true)
    }

    /// Replace the per-iteration schedule.
    pub fn set_schedule(&mut self, schedule: Schedule) {
        self.schedule = schedule;
        self.explicit_schedule = true;
        self.schedule_version += 1;
        debug!(
            version = self.schedule_version,
            entries = self.schedule.len(),
            "message graph: schedule replaced"
        );
    }

    /// Drop any explicit schedule and go back to flooding over all nodes.
    pub fn use_flooding_schedule(&mut self) {
        self.explicit_schedule = false;
        self.schedule = Schedule::flooding(self);
        self.schedule_version += 1;
    }

    /// Damping factor in `[0, 1)`.
    pub fn set_damping(&mut self, damping: f64) -> Result<()> {
        if !(0.0..1.0).contains(&damping) {
            return Err(MtschedError::ConfigError(format!(
                "damping must be in [0, 1) (got {damping})"
            )));
        }
        self.damping = damping;
        Ok(())
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, node: NodeId) -> Option<&str> {
        self.names.get(node.0).map(|s| s.as_str())
    }

    pub fn bias_of(&self, node: NodeId) -> Option<f64> {
        self.bias.get(node.0).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.names.len()).map(NodeId)
    }

    /// Current value of a port.
    pub fn message(&self, port: Port) -> Option<f64> {
        self.inbox
            .get(port.node.0)?
            .get(port.index)
            .map(|slot| f64::from_bits(slot.load(Ordering::Acquire)))
    }

    /// Snapshot of every port value, ordered by `(node, index)`.
    pub fn messages(&self) -> Vec<(Port, f64)> {
        let mut out = Vec::new();
        for (n, slots) in self.inbox.iter().enumerate() {
            for (i, slot) in slots.iter().enumerate() {
                out.push((
                    Port::new(NodeId(n), i),
                    f64::from_bits(slot.load(Ordering::Acquire)),
                ));
            }
        }
        out
    }

    /// Zero every port.
    pub fn reset_messages(&self) {
        for slot in self.inbox.iter().flatten() {
            slot.store(0f64.to_bits(), Ordering::Release);
        }
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node.0 < self.names.len() {
            Ok(())
        } else {
            Err(MtschedError::UnknownNode(node.to_string()))
        }
    }

    fn structure_changed(&mut self) {
        self.structure_version += 1;
        if !self.explicit_schedule {
            self.schedule = Schedule::flooding(self);
            self.schedule_version += 1;
        }
    }

    fn update_node(&self, node: NodeId) -> anyhow::Result<()> {
        for k in 0..self.siblings_checked(node)?.len() {
            self.update_edge(node, k)?;
        }
        Ok(())
    }

    fn update_edge(&self, node: NodeId, out: usize) -> anyhow::Result<()> {
        let inbox = &self.inbox[self.check_index(node)?];
        if out >= inbox.len() {
            bail!("{node} has no port {out}");
        }

        let incoming: f64 = inbox
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != out)
            .map(|(_, slot)| f64::from_bits(slot.load(Ordering::Acquire)))
            .sum();
        let raw = (self.bias[node.0] + 0.5 * incoming).tanh();

        let Some(target) = self.reverse_port(node, out) else {
            bail!("{node} port {out} has no reverse port");
        };
        let slot = &self.inbox[target.node.0][target.index];
        let previous = f64::from_bits(slot.load(Ordering::Acquire));
        let value = (1.0 - self.damping) * raw + self.damping * previous;
        slot.store(value.to_bits(), Ordering::Release);
        Ok(())
    }

    fn siblings_checked(&self, node: NodeId) -> anyhow::Result<&[NodeId]> {
        match self.siblings.get(node.0) {
            Some(s) => Ok(s.as_slice()),
            None => bail!("unknown node {node}"),
        }
    }

    fn check_index(&self, node: NodeId) -> anyhow::Result<usize> {
        if node.0 < self.inbox.len() {
            Ok(node.0)
        } else {
            bail!("unknown node {node}")
        }
    }
}

impl FactorModel for MessageGraph {
    fn model_id(&self) -> u64 {
        self.id
    }

    fn node_count(&self) -> usize {
        self.names.len()
    }

    fn siblings(&self, node: NodeId) -> &[NodeId] {
        self.siblings
            .get(node.0)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    fn port_num(&self, node: NodeId, sibling: NodeId) -> Option<usize> {
        self.siblings.get(node.0)?.iter().position(|s| *s == sibling)
    }

    fn structure_version(&self) -> u64 {
        self.structure_version
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn schedule_version(&self) -> u64 {
        self.schedule_version
    }

    fn update(&self, entry: &ScheduleEntry) -> anyhow::Result<()> {
        match entry {
            ScheduleEntry::Node(node) => self.update_node(*node),
            ScheduleEntry::Edge { node, port } => self.update_edge(*node, *port),
            ScheduleEntry::Block(nodes) => {
                for node in nodes {
                    self.update_node(*node)?;
                }
                Ok(())
            }
            ScheduleEntry::SubSchedule(_) => {
                bail!("sub-schedules are expanded before they reach update()")
            }
        }
    }

    fn node_name(&self, node: NodeId) -> String {
        self.name_of(node)
            .map(|s| s.to_string())
            .unwrap_or_else(|| node.to_string())
    }
}
