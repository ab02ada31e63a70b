// src/engine/locks.rs

use parking_lot::{Mutex, MutexGuard};

use crate::model::NodeId;

/// One mutex per model node, held for the duration of an `update` call.
///
/// Entries lock the nodes they touch in ascending id order, so block
/// entries spanning several nodes cannot deadlock against each other.
#[derive(Debug, Default)]
pub struct NodeLocks {
    locks: Vec<Mutex<()>>,
    structure_version: Option<u64>,
}

impl NodeLocks {
    pub fn new(node_count: usize) -> Self {
        Self {
            locks: (0..node_count).map(|_| Mutex::new(())).collect(),
            structure_version: None,
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Resize to `node_count` locks unless already built for
    /// `structure_version`.
    pub fn ensure(&mut self, node_count: usize, structure_version: u64) {
        if self.structure_version == Some(structure_version) && self.locks.len() == node_count {
            return;
        }
        *self = Self::new(node_count);
        self.structure_version = Some(structure_version);
    }

    /// Lock every node in `nodes`, which must be sorted and deduplicated.
    ///
    /// # Panics
    ///
    /// If a node id is out of range.
    pub fn lock_all(&self, nodes: &[NodeId]) -> Vec<MutexGuard<'_, ()>> {
        debug_assert!(
            nodes.windows(2).all(|w| w[0] < w[1]),
            "node locks must be taken in ascending order"
        );
        nodes.iter().map(|node| self.locks[node.0].lock()).collect()
    }
}
