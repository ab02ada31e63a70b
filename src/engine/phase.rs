// src/engine/phase.rs

//! Phase-by-phase execution with per-worker queues and work stealing.

use crossbeam_channel::{Receiver, unbounded};
use rayon::ThreadPool;
use tracing::{Span, debug, info, info_span, trace};

use crate::dag::{DependencyGraph, NodeIndex, StaticDependencyGraph};
use crate::engine::cache::GraphCache;
use crate::engine::context::RunContext;
use crate::engine::locks::NodeLocks;
use crate::engine::pool::WorkerPool;
use crate::engine::static_queue::static_graph;
use crate::engine::worker::{guard_loop, run_entry};
use crate::engine::ExecutionEngine;
use crate::errors::Result;
use crate::model::FactorModel;
use crate::schedule::ScheduleEntry;
use crate::types::EngineMode;

/// Runs the per-iteration graph as a sequence of phases. Each phase is a
/// barrier: the next one starts only after every entry of the current one
/// has finished.
#[derive(Debug, Default)]
pub struct PhaseEngine {
    cache: GraphCache<StaticDependencyGraph>,
}

impl PhaseEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&mut self, model: &dyn FactorModel) -> Result<&StaticDependencyGraph> {
        static_graph(&mut self.cache, model)
    }
}

impl ExecutionEngine for PhaseEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Phase
    }

    fn prepare(&mut self, model: &dyn FactorModel, _iterations: usize) -> Result<()> {
        self.graph(model).map(|_| ())
    }

    fn run(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
        pool: &mut WorkerPool,
        locks: &NodeLocks,
    ) -> Result<()> {
        let workers = pool.workers();
        let rayon = pool.rayon()?;
        let graph = static_graph(&mut self.cache, model)?;

        info!(
            workers,
            iterations,
            phases = graph.phase_indices().len(),
            nodes = graph.node_count(),
            "phase run started"
        );
        for iteration in 0..iterations {
            execute_phases(rayon, graph.graph(), graph.phase_indices(), model, locks, workers)?;
            debug!(iteration, "phase iteration finished");
        }
        Ok(())
    }

    fn phases(
        &mut self,
        model: &dyn FactorModel,
        _iterations: usize,
    ) -> Result<Vec<Vec<ScheduleEntry>>> {
        Ok(self.graph(model)?.phases())
    }

    fn graph_builds(&self) -> usize {
        self.cache.builds()
    }
}

/// Run `phases` of `graph` in order on `rayon`.
///
/// `phases` must list every node once with dependencies always in an
/// earlier phase (see [`phase_layers`](crate::dag::phase_layers)).
pub fn execute_phases(
    rayon: &ThreadPool,
    graph: &DependencyGraph<ScheduleEntry>,
    phases: &[Vec<NodeIndex>],
    model: &dyn FactorModel,
    locks: &NodeLocks,
    workers: usize,
) -> Result<()> {
    for (phase, members) in phases.iter().enumerate() {
        trace!(phase, entries = members.len(), "running phase");
        run_phase(rayon, graph, members, model, locks, workers)?;
    }
    Ok(())
}

/// Split `members` into `workers` contiguous chunks, one queue each, and
/// block until all of them are drained.
fn run_phase(
    rayon: &ThreadPool,
    graph: &DependencyGraph<ScheduleEntry>,
    members: &[NodeIndex],
    model: &dyn FactorModel,
    locks: &NodeLocks,
    workers: usize,
) -> Result<()> {
    if members.is_empty() {
        return Ok(());
    }

    let chunk = members.len().div_ceil(workers);
    let queues: Vec<Receiver<NodeIndex>> = (0..workers)
        .map(|worker| {
            let (tx, rx) = unbounded();
            for &index in members.iter().skip(worker * chunk).take(chunk) {
                let _ = tx.send(index);
            }
            rx
        })
        .collect();

    let ctx = RunContext::new(members.len());
    let stealer = Stealer {
        graph,
        model,
        locks,
        ctx: &ctx,
        queues: &queues,
    };

    let parent = Span::current();
    rayon.scope(|scope| {
        for worker in 0..workers {
            let span = info_span!(parent: &parent, "worker", worker);
            scope.spawn(move |_| {
                let _entered = span.enter();
                if let Some(err) = guard_loop(worker, || stealer.drain(worker)) {
                    stealer.ctx.fail(err);
                }
            });
        }
    });

    ctx.take_result()?;
    debug_assert_eq!(ctx.remaining(), 0, "phase finished with entries left");
    Ok(())
}

#[derive(Clone, Copy)]
struct Stealer<'a> {
    graph: &'a DependencyGraph<ScheduleEntry>,
    model: &'a dyn FactorModel,
    locks: &'a NodeLocks,
    ctx: &'a RunContext,
    queues: &'a [Receiver<NodeIndex>],
}

impl Stealer<'_> {
    /// Drain the own queue, then sweep the others starting at our own
    /// index. Stops after a full sweep finds every queue empty; a phase
    /// never gains entries once started, so nothing can be missed.
    fn drain(&self, worker: usize) {
        let count = self.queues.len();
        loop {
            let mut found = false;
            for offset in 0..count {
                let victim = (worker + offset) % count;
                while let Ok(index) = self.queues[victim].try_recv() {
                    if self.ctx.is_aborted() {
                        return;
                    }
                    if victim != worker {
                        trace!(worker, victim, index, "stole entry");
                    }
                    found = true;
                    if let Err(err) = run_entry(self.model, self.graph.payload(index), self.locks, worker) {
                        self.ctx.fail(err);
                        return;
                    }
                    self.ctx.complete_one();
                }
            }
            if !found {
                return;
            }
        }
    }
}
