// src/schedule/mod.rs

//! Schedules: the per-iteration list of update operations an engine runs.
//!
//! - [`entry`] defines [`ScheduleEntry`] and how each kind maps onto the
//!   ports it reads and writes.

pub mod entry;

use std::sync::Arc;

use crate::errors::{MtschedError, Result};
use crate::model::{FactorModel, NodeId};

pub use entry::{PortAccess, ScheduleEntry};

/// Whether a schedule is a statically enumerable list.
///
/// Dependency graphs can only be built from `Fixed` schedules; a `Dynamic`
/// schedule decides its next entry while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScheduleKind {
    #[default]
    Fixed,
    Dynamic,
}

/// Ordered list of schedule entries for one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Schedule {
    kind: ScheduleKind,
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn fixed(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            kind: ScheduleKind::Fixed,
            entries,
        }
    }

    pub fn dynamic(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            kind: ScheduleKind::Dynamic,
            entries,
        }
    }

    /// One node entry per model node, in id order.
    pub fn flooding<M: FactorModel + ?Sized>(model: &M) -> Self {
        Self::fixed(
            (0..model.node_count())
                .map(|n| ScheduleEntry::Node(NodeId(n)))
                .collect(),
        )
    }

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: ScheduleEntry) {
        self.entries.push(entry);
    }

    /// Wrap this schedule as a nested entry of another schedule.
    pub fn into_entry(self) -> ScheduleEntry {
        ScheduleEntry::SubSchedule(Arc::new(self))
    }

    /// Reject schedules that cannot be enumerated ahead of time, at any
    /// nesting depth.
    pub fn ensure_fixed(&self) -> Result<()> {
        if self.kind == ScheduleKind::Dynamic {
            return Err(MtschedError::UnsupportedSchedule(
                "cannot build a dependency graph from a dynamic schedule".to_string(),
            ));
        }
        for entry in &self.entries {
            if let ScheduleEntry::SubSchedule(inner) = entry {
                inner.ensure_fixed()?;
            }
        }
        Ok(())
    }

    /// Leaf entries in execution order, with sub-schedules expanded.
    pub fn leaf_entries(&self) -> Vec<&ScheduleEntry> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    /// Number of leaf entries (graph nodes per iteration).
    pub fn leaf_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match e {
                ScheduleEntry::SubSchedule(inner) => inner.leaf_count(),
                _ => 1,
            })
            .sum()
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a ScheduleEntry>) {
        for entry in &self.entries {
            match entry {
                ScheduleEntry::SubSchedule(inner) => inner.collect_leaves(out),
                leaf => out.push(leaf),
            }
        }
    }
}

impl FromIterator<ScheduleEntry> for Schedule {
    fn from_iter<I: IntoIterator<Item = ScheduleEntry>>(iter: I) -> Self {
        Self::fixed(iter.into_iter().collect())
    }
}
