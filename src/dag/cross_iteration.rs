// src/dag/cross_iteration.rs

//! Loop-unrolled dependency graph spanning every requested iteration.

use std::collections::HashMap;

use tracing::debug;

use crate::dag::access::AccessTracker;
use crate::dag::{DependencyGraph, NodeIndex};
use crate::errors::Result;
use crate::model::FactorModel;
use crate::schedule::{Schedule, ScheduleEntry};

/// Build a graph that replays `schedule` `iterations` times.
///
/// Within the unrolled sequence every entry waits for the conflicting
/// accesses before it (see [`AccessTracker`]). When an entry recurs, the new
/// occurrence also waits for its previous occurrence and for everything that
/// depended on the previous occurrence so far: a damped update blends with
/// the previous output, which must not be replaced before all its readers
/// have consumed it.
///
/// Dynamic schedules are rejected before any node is created.
pub fn build_cross_iteration_graph<M: FactorModel + ?Sized>(
    model: &M,
    schedule: &Schedule,
    iterations: usize,
) -> Result<DependencyGraph<ScheduleEntry>> {
    schedule.ensure_fixed()?;

    let mut builder = CrossIterationBuilder::new(model);
    for iteration in 0..iterations {
        builder.add_schedule(schedule)?;
        debug!(
            iteration,
            nodes = builder.graph.len(),
            "cross-iteration graph: iteration unrolled"
        );
    }

    let graph = builder.graph;
    debug!(
        iterations,
        nodes = graph.len(),
        edges = graph.edge_count(),
        "cross-iteration graph built"
    );
    Ok(graph)
}

struct CrossIterationBuilder<'m, M: ?Sized> {
    model: &'m M,
    graph: DependencyGraph<ScheduleEntry>,
    tracker: AccessTracker,
    /// Most recent occurrence of each entry.
    last_occurrence: HashMap<ScheduleEntry, NodeIndex>,
}

impl<'m, M: FactorModel + ?Sized> CrossIterationBuilder<'m, M> {
    fn new(model: &'m M) -> Self {
        Self {
            model,
            graph: DependencyGraph::new(),
            tracker: AccessTracker::new(),
            last_occurrence: HashMap::new(),
        }
    }

    /// Nested schedules share the tracker and occurrence map with the outer
    /// one so their dependencies interleave with the surrounding entries.
    fn add_schedule(&mut self, schedule: &Schedule) -> Result<()> {
        for entry in schedule.entries() {
            match entry {
                ScheduleEntry::SubSchedule(inner) => self.add_schedule(inner)?,
                leaf => {
                    self.add_entry(leaf)?;
                }
            }
        }
        Ok(())
    }

    fn add_entry(&mut self, entry: &ScheduleEntry) -> Result<NodeIndex> {
        let access = entry.touched_ports(self.model)?;
        let index = self.graph.add(entry.clone());

        let deps = self.tracker.record(index, &access);
        self.graph.add_dependencies(index, deps);

        if let Some(previous) = self.last_occurrence.insert(entry.clone(), index) {
            let readers: Vec<NodeIndex> = self
                .graph
                .node(previous)
                .dependents()
                .filter(|&d| d != index)
                .collect();
            self.graph.add_dependencies(index, readers);
            self.graph.add_dependency(index, previous);
        }

        Ok(index)
    }
}
