// src/dag/static_graph.rs

//! Compact per-iteration dependency graph with countdown counters.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use crate::dag::access::AccessTracker;
use crate::dag::dot;
use crate::dag::{DependencyGraph, NodeIndex};
use crate::errors::Result;
use crate::model::FactorModel;
use crate::schedule::{Schedule, ScheduleEntry};

/// One iteration's dependency graph, reused verbatim across iterations.
///
/// Besides the edges, every node carries a dependency counter that engines
/// count down as predecessors finish; a node whose counter reaches zero is
/// ready, and its counter is immediately restored to the original dependency
/// count for the next iteration.
///
/// Nodes are also assigned a phase while building: roots are phase 0, every
/// other node sits one phase after its latest dependency. Entries sharing a
/// phase have no dependency relation among themselves.
#[derive(Debug)]
pub struct StaticDependencyGraph {
    graph: DependencyGraph<ScheduleEntry>,
    phase_of: Vec<usize>,
    phases: Vec<Vec<NodeIndex>>,
    initial: Vec<NodeIndex>,
    counters: Vec<AtomicUsize>,
}

impl StaticDependencyGraph {
    /// Build the graph for a single iteration of `schedule`.
    pub fn build<M: FactorModel + ?Sized>(model: &M, schedule: &Schedule) -> Result<Self> {
        Self::build_unrolled(model, schedule, 1)
    }

    /// Build one static graph covering `iterations` back-to-back copies of
    /// `schedule`.
    pub fn build_unrolled<M: FactorModel + ?Sized>(
        model: &M,
        schedule: &Schedule,
        iterations: usize,
    ) -> Result<Self> {
        schedule.ensure_fixed()?;

        let mut this = Self {
            graph: DependencyGraph::new(),
            phase_of: Vec::new(),
            phases: Vec::new(),
            initial: Vec::new(),
            counters: Vec::new(),
        };
        let mut tracker = AccessTracker::new();
        for _ in 0..iterations {
            this.add_schedule(model, schedule, &mut tracker)?;
        }

        debug!(
            nodes = this.graph.len(),
            edges = this.graph.edge_count(),
            phases = this.phases.len(),
            "static dependency graph built"
        );
        Ok(this)
    }

    fn add_schedule<M: FactorModel + ?Sized>(
        &mut self,
        model: &M,
        schedule: &Schedule,
        tracker: &mut AccessTracker,
    ) -> Result<()> {
        for entry in schedule.entries() {
            match entry {
                ScheduleEntry::SubSchedule(inner) => self.add_schedule(model, inner, tracker)?,
                leaf => self.add_entry(model, leaf, tracker)?,
            }
        }
        Ok(())
    }

    fn add_entry<M: FactorModel + ?Sized>(
        &mut self,
        model: &M,
        entry: &ScheduleEntry,
        tracker: &mut AccessTracker,
    ) -> Result<()> {
        let access = entry.touched_ports(model)?;
        let index = self.graph.add(entry.clone());
        let deps = tracker.record(index, &access);

        let phase = deps
            .iter()
            .map(|&d| self.phase_of[d] + 1)
            .max()
            .unwrap_or(0);
        let count = deps.len();
        self.graph.add_dependencies(index, deps);

        self.phase_of.push(phase);
        if self.phases.len() <= phase {
            self.phases.resize_with(phase + 1, Vec::new);
        }
        self.phases[phase].push(index);
        if phase == 0 {
            self.initial.push(index);
        }
        self.counters.push(AtomicUsize::new(count));
        Ok(())
    }

    pub fn graph(&self) -> &DependencyGraph<ScheduleEntry> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    /// Nodes with no dependencies; they seed every iteration.
    pub fn initial_entries(&self) -> &[NodeIndex] {
        &self.initial
    }

    pub fn phase_of(&self, index: NodeIndex) -> usize {
        self.phase_of[index]
    }

    /// Node indices per phase, phases in execution order.
    pub fn phase_indices(&self) -> &[Vec<NodeIndex>] {
        &self.phases
    }

    /// Schedule entries per phase, for callers that want their own
    /// partitioning.
    pub fn phases(&self) -> Vec<Vec<ScheduleEntry>> {
        self.phases
            .iter()
            .map(|phase| phase.iter().map(|&i| self.graph.payload(i).clone()).collect())
            .collect()
    }

    pub fn original_dependency_count(&self, index: NodeIndex) -> usize {
        self.graph.node(index).dependency_count()
    }

    /// Dependencies still outstanding for `index` in the current iteration.
    pub fn dependency_count(&self, index: NodeIndex) -> usize {
        self.counters[index].load(Ordering::Acquire)
    }

    /// Count down one finished dependency of `index`. Returns `true` when
    /// that was the last one; the counter is then already restored for the
    /// next iteration.
    ///
    /// A counter only reaches zero after all of its predecessors in this
    /// iteration have released it, so the restore cannot race with another
    /// decrement of the same iteration.
    pub fn release_dependency(&self, index: NodeIndex) -> bool {
        let previous = self.counters[index].fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "dependency counter of node {index} underflowed");
        if previous == 1 {
            self.counters[index].store(self.original_dependency_count(index), Ordering::Release);
            true
        } else {
            false
        }
    }

    /// Restore every counter, e.g. after an aborted run left some half-way.
    pub fn reset_counters(&self) {
        for (index, counter) in self.counters.iter().enumerate() {
            counter.store(self.original_dependency_count(index), Ordering::Release);
        }
    }

    /// DOT rendering with entries labelled by model node names.
    pub fn to_dot<M: FactorModel + ?Sized>(&self, model: &M) -> String {
        dot::to_dot(&self.graph, |_, entry| entry.describe(model), |i| self.phase_of[i])
    }

    pub fn write_dot<M: FactorModel + ?Sized>(&self, model: &M, path: &Path) -> Result<()> {
        dot::write_dot(
            &self.graph,
            |_, entry| entry.describe(model),
            |i| self.phase_of[i],
            path,
        )
    }
}
