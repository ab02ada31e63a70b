// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::engine::MultithreadingOptions;
use crate::errors::{MtschedError, Result};
use crate::model::{MessageGraph, NodeId};
use crate::schedule::{Schedule, ScheduleEntry};
use crate::types::EngineMode;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// mode = "phase"
/// workers = 4
/// iterations = 10
/// damping = 0.25
///
/// [node.x]
/// bias = 0.5
/// neighbors = ["f"]
///
/// [node.f]
/// neighbors = ["y"]
///
/// [[schedule]]
/// node = "x"
///
/// [[schedule]]
/// edge = "f"
/// port = 1
/// ```
///
/// Every section is optional except at least one `[node.<name>]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are node names; nodes get ids in key order.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,

    /// Explicit per-iteration schedule. Empty means flooding.
    #[serde(default)]
    pub schedule: Vec<ScheduleEntryConfig>,
}

/// A [`RawConfigFile`] that passed validation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub node: BTreeMap<String, NodeConfig>,
    pub schedule: Vec<ScheduleEntryConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    #[serde(default)]
    pub mode: EngineMode,

    /// Worker threads; defaults to the number of CPUs.
    #[serde(default)]
    pub workers: Option<usize>,

    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// `false` runs the schedule on the calling thread.
    #[serde(default = "default_multithreading")]
    pub multithreading: bool,

    /// Weight of the previous message in `[0, 1)`.
    #[serde(default)]
    pub damping: f64,
}

fn default_iterations() -> usize {
    1
}

fn default_multithreading() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            mode: EngineMode::default(),
            workers: None,
            iterations: default_iterations(),
            multithreading: default_multithreading(),
            damping: 0.0,
        }
    }
}

/// `[node.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    #[serde(default)]
    pub bias: f64,

    /// Undirected: listing `b` under `a` and `a` under `b` is one edge.
    #[serde(default)]
    pub neighbors: Vec<String>,
}

/// One `[[schedule]]` item. Exactly one of `node`, `edge`, `block` is set;
/// `port` goes with `edge`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleEntryConfig {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub edge: Option<String>,
    #[serde(default)]
    pub port: Option<usize>,
    #[serde(default)]
    pub block: Option<Vec<String>>,
}

impl ConfigFile {
    /// Wrap already-validated parts. Prefer `ConfigFile::try_from`.
    pub fn new_unchecked(
        config: ConfigSection,
        node: BTreeMap<String, NodeConfig>,
        schedule: Vec<ScheduleEntryConfig>,
    ) -> Self {
        Self {
            config,
            node,
            schedule,
        }
    }

    pub fn options(&self) -> MultithreadingOptions {
        let defaults = MultithreadingOptions::default();
        MultithreadingOptions {
            mode: self.config.mode,
            workers: self.config.workers.unwrap_or(defaults.workers),
            enabled: self.config.multithreading,
        }
    }

    pub fn iterations(&self) -> usize {
        self.config.iterations
    }

    /// Build the model this config describes.
    ///
    /// Ports are numbered in the order edges are first seen while walking
    /// nodes by name and each node's `neighbors` in order.
    pub fn build_model(&self) -> Result<MessageGraph> {
        let mut graph = MessageGraph::new();
        for (name, node) in &self.node {
            graph.add_node(name.clone(), node.bias)?;
        }
        for (name, node) in &self.node {
            let a = lookup(&graph, name)?;
            for neighbor in &node.neighbors {
                let b = lookup(&graph, neighbor)?;
                graph.connect(a, b)?;
            }
        }
        graph.set_damping(self.config.damping)?;

        if !self.schedule.is_empty() {
            let entries = self
                .schedule
                .iter()
                .map(|entry| entry.resolve(&graph))
                .collect::<Result<Vec<_>>>()?;
            graph.set_schedule(Schedule::fixed(entries));
        }
        Ok(graph)
    }
}

impl ScheduleEntryConfig {
    /// Which form this item uses, for error messages.
    pub fn describe(&self) -> String {
        match (&self.node, &self.edge, &self.block) {
            (Some(node), None, None) => format!("node = {node:?}"),
            (None, Some(edge), None) => format!("edge = {edge:?}, port = {:?}", self.port),
            (None, None, Some(block)) => format!("block = {block:?}"),
            _ => "<malformed schedule item>".to_string(),
        }
    }

    fn resolve(&self, graph: &MessageGraph) -> Result<ScheduleEntry> {
        match (&self.node, &self.edge, &self.block, self.port) {
            (Some(node), None, None, None) => Ok(ScheduleEntry::node(lookup(graph, node)?)),
            (None, Some(edge), None, Some(port)) => {
                Ok(ScheduleEntry::edge(lookup(graph, edge)?, port))
            }
            (None, None, Some(block), None) => {
                let nodes = block
                    .iter()
                    .map(|name| lookup(graph, name))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ScheduleEntry::block(nodes))
            }
            _ => Err(MtschedError::ConfigError(format!(
                "schedule item must set exactly one of `node`, `edge` (with `port`) or `block`: {}",
                self.describe()
            ))),
        }
    }
}

fn lookup(graph: &MessageGraph, name: &str) -> Result<NodeId> {
    graph
        .node_by_name(name)
        .ok_or_else(|| MtschedError::UnknownNode(name.to_string()))
}
