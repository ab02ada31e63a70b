// src/dag/access.rs

//! Build-time port access tracking (the "last writer" map).

use std::collections::{BTreeSet, HashMap};

use crate::dag::NodeIndex;
use crate::model::Port;
use crate::schedule::PortAccess;

/// Records, per port, every graph node that has written it (in build order)
/// and the readers since the most recent write.
///
/// [`record`](Self::record) returns the earlier nodes a new access set has to
/// wait for:
/// - a read waits for the port's last writer
/// - a write waits for the port's last writer and for every reader since
///   that write
///
/// Only lives while a graph is being built.
#[derive(Debug, Default)]
pub struct AccessTracker {
    writers: HashMap<Port, Vec<NodeIndex>>,
    readers: HashMap<Port, Vec<NodeIndex>>,
}

impl AccessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_writer(&self, port: &Port) -> Option<NodeIndex> {
        self.writers.get(port).and_then(|w| w.last().copied())
    }

    /// All writers of `port` so far, oldest first.
    pub fn writers_of(&self, port: &Port) -> &[NodeIndex] {
        self.writers
            .get(port)
            .map(|w| w.as_slice())
            .unwrap_or(&[])
    }

    /// Register `index`'s accesses and return the nodes it depends on.
    pub fn record(&mut self, index: NodeIndex, access: &PortAccess) -> BTreeSet<NodeIndex> {
        let mut deps = BTreeSet::new();

        for port in &access.reads {
            if let Some(writer) = self.last_writer(port) {
                deps.insert(writer);
            }
        }
        for port in &access.writes {
            if let Some(writer) = self.last_writer(port) {
                deps.insert(writer);
            }
            if let Some(readers) = self.readers.get(port) {
                deps.extend(readers.iter().copied());
            }
        }
        deps.remove(&index);

        for port in &access.reads {
            let readers = self.readers.entry(*port).or_default();
            if readers.last() != Some(&index) {
                readers.push(index);
            }
        }
        for port in &access.writes {
            self.writers.entry(*port).or_default().push(index);
            self.readers.remove(port);
        }

        deps
    }
}
