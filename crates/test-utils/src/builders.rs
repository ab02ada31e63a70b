#![allow(dead_code)]

use std::collections::BTreeMap;

use mtsched::config::{ConfigFile, ConfigSection, NodeConfig, RawConfigFile, ScheduleEntryConfig};
use mtsched::model::{MessageGraph, NodeId};
use mtsched::types::EngineMode;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                node: BTreeMap::new(),
                schedule: Vec::new(),
            },
        }
    }

    pub fn with_node(mut self, name: &str, bias: f64, neighbors: &[&str]) -> Self {
        self.config.node.insert(
            name.to_string(),
            NodeConfig {
                bias,
                neighbors: neighbors.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn mode(mut self, mode: EngineMode) -> Self {
        self.config.config.mode = mode;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.config.workers = Some(workers);
        self
    }

    pub fn iterations(mut self, iterations: usize) -> Self {
        self.config.config.iterations = iterations;
        self
    }

    pub fn damping(mut self, damping: f64) -> Self {
        self.config.config.damping = damping;
        self
    }

    pub fn schedule_node(mut self, name: &str) -> Self {
        self.config.schedule.push(ScheduleEntryConfig {
            node: Some(name.to_string()),
            ..Default::default()
        });
        self
    }

    pub fn schedule_edge(mut self, name: &str, port: usize) -> Self {
        self.config.schedule.push(ScheduleEntryConfig {
            edge: Some(name.to_string()),
            port: Some(port),
            ..Default::default()
        });
        self
    }

    pub fn schedule_block(mut self, names: &[&str]) -> Self {
        self.config.schedule.push(ScheduleEntryConfig {
            block: Some(names.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        });
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Bias for node `i` of the generated models; distinct so messages differ.
pub fn bias_for(i: usize) -> f64 {
    ((i * 37) % 17) as f64 / 17.0 - 0.5
}

/// `n0 - n1 - ... - n{n-1}`.
pub fn chain(n: usize) -> MessageGraph {
    let mut graph = MessageGraph::new();
    let ids = add_nodes(&mut graph, n);
    for pair in ids.windows(2) {
        graph.connect(pair[0], pair[1]).expect("connect chain");
    }
    graph
}

/// A closed ring of `n >= 3` nodes.
pub fn ring(n: usize) -> MessageGraph {
    let mut graph = chain(n);
    graph.connect(NodeId(n - 1), NodeId(0)).expect("close ring");
    graph
}

/// Hub `n0` connected to `leaves` leaf nodes `n1..=n{leaves}`.
pub fn star(leaves: usize) -> MessageGraph {
    let mut graph = MessageGraph::new();
    let ids = add_nodes(&mut graph, leaves + 1);
    for leaf in &ids[1..] {
        graph.connect(ids[0], *leaf).expect("connect star");
    }
    graph
}

/// `width x height` 4-connected grid, row-major ids.
pub fn grid(width: usize, height: usize) -> MessageGraph {
    let mut graph = MessageGraph::new();
    let ids = add_nodes(&mut graph, width * height);
    for y in 0..height {
        for x in 0..width {
            let id = ids[y * width + x];
            if x + 1 < width {
                graph.connect(id, ids[y * width + x + 1]).expect("connect grid");
            }
            if y + 1 < height {
                graph.connect(id, ids[(y + 1) * width + x]).expect("connect grid");
            }
        }
    }
    graph
}

/// Every pair of the `n` nodes connected.
pub fn complete(n: usize) -> MessageGraph {
    let mut graph = MessageGraph::new();
    let ids = add_nodes(&mut graph, n);
    for (i, a) in ids.iter().enumerate() {
        for b in &ids[i + 1..] {
            graph.connect(*a, *b).expect("connect complete");
        }
    }
    graph
}

fn add_nodes(graph: &mut MessageGraph, n: usize) -> Vec<NodeId> {
    (0..n)
        .map(|i| graph.add_node(format!("n{i}"), bias_for(i)).expect("add node"))
        .collect()
}
