// src/engine/cross_iteration.rs

//! Single shared queue over the loop-unrolled graph.

use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::dag::{DependencyGraph, NodeIndex, build_cross_iteration_graph, phase_layers};
use crate::engine::cache::{GraphCache, GraphVersion};
use crate::engine::context::RunContext;
use crate::engine::locks::NodeLocks;
use crate::engine::pool::{WorkerPool, spawn_workers};
use crate::engine::worker::{guard_loop, run_entry};
use crate::engine::ExecutionEngine;
use crate::errors::Result;
use crate::model::FactorModel;
use crate::schedule::ScheduleEntry;
use crate::types::EngineMode;

/// Runs every iteration in one pass over a graph unrolled `iterations`
/// times, so entries of iteration `k + 1` may start while iteration `k`
/// is still finishing.
#[derive(Debug, Default)]
pub struct CrossIterationEngine {
    cache: GraphCache<DependencyGraph<ScheduleEntry>>,
}

impl CrossIterationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The unrolled graph for `model` and `iterations`, building it if needed.
    pub fn graph(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
    ) -> Result<&DependencyGraph<ScheduleEntry>> {
        self.cache
            .get_or_build(GraphVersion::of(model, iterations), || {
                build_cross_iteration_graph(model, model.schedule(), iterations)
            })
    }
}

impl ExecutionEngine for CrossIterationEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::CrossIteration
    }

    fn prepare(&mut self, model: &dyn FactorModel, iterations: usize) -> Result<()> {
        self.graph(model, iterations).map(|_| ())
    }

    fn run(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
        pool: &mut WorkerPool,
        locks: &NodeLocks,
    ) -> Result<()> {
        let workers = pool.workers();
        let graph = self.graph(model, iterations)?;
        execute_graph(graph, model, locks, workers)
    }

    fn phases(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
    ) -> Result<Vec<Vec<ScheduleEntry>>> {
        let graph = self.graph(model, iterations)?;
        Ok(phase_layers(graph)
            .into_iter()
            .map(|layer| layer.into_iter().map(|i| graph.payload(i).clone()).collect())
            .collect())
    }

    fn graph_builds(&self) -> usize {
        self.cache.builds()
    }
}

/// Run every node of `graph` once on `workers` threads.
///
/// Workers pull ready nodes from a shared queue, update them under their
/// node locks and enqueue the dependents that became ready. The calling
/// thread waits on the run's completion monitor and then closes the
/// shutdown channel, which releases every worker still blocked on the queue.
pub fn execute_graph(
    graph: &DependencyGraph<ScheduleEntry>,
    model: &dyn FactorModel,
    locks: &NodeLocks,
    workers: usize,
) -> Result<()> {
    if graph.is_empty() {
        return Ok(());
    }

    graph.initialize();
    let ctx = RunContext::new(graph.len());
    let (work_tx, work_rx) = unbounded::<NodeIndex>();
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
    for root in graph.roots() {
        // The receiver is alive for the whole function.
        let _ = work_tx.send(root);
    }
    // Serializes "mark completed, collect newly ready dependents" so a node
    // whose last two dependencies finish together is enqueued once.
    let bookkeeping = Mutex::new(());

    info!(
        workers,
        nodes = graph.len(),
        roots = graph.roots().count(),
        "cross-iteration run started"
    );

    thread::scope(|scope| {
        let shared = Shared {
            graph,
            model,
            locks,
            ctx: &ctx,
            work_tx: &work_tx,
            work_rx: &work_rx,
            shutdown_rx: &shutdown_rx,
            bookkeeping: &bookkeeping,
        };
        let spawned = spawn_workers(scope, "mtsched-cross", workers, move |worker| {
            if let Some(err) = guard_loop(worker, || shared.worker_loop(worker)) {
                shared.ctx.fail(err);
            }
        });

        match spawned {
            Ok(_) => ctx.wait(),
            Err(err) => {
                ctx.fail(err);
            }
        }
        // Interrupt the workers; the scope joins them on exit.
        drop(shutdown_tx);
    });

    debug!(remaining = ctx.remaining(), "cross-iteration run finished");
    ctx.take_result()
}

#[derive(Clone, Copy)]
struct Shared<'a> {
    graph: &'a DependencyGraph<ScheduleEntry>,
    model: &'a dyn FactorModel,
    locks: &'a NodeLocks,
    ctx: &'a RunContext,
    work_tx: &'a Sender<NodeIndex>,
    work_rx: &'a Receiver<NodeIndex>,
    shutdown_rx: &'a Receiver<()>,
    bookkeeping: &'a Mutex<()>,
}

impl Shared<'_> {
    fn worker_loop(&self, worker: usize) {
        loop {
            let index = select! {
                recv(self.work_rx) -> msg => match msg {
                    Ok(index) => index,
                    Err(_) => return,
                },
                recv(self.shutdown_rx) -> _ => return,
            };
            if self.ctx.is_aborted() {
                return;
            }

            let entry = self.graph.payload(index);
            if let Err(err) = run_entry(self.model, entry, self.locks, worker) {
                self.ctx.fail(err);
                return;
            }

            let ready: Vec<NodeIndex> = {
                let _guard = self.bookkeeping.lock();
                self.graph.mark_completed(index);
                self.graph
                    .node(index)
                    .dependents()
                    .filter(|&d| self.graph.all_dependencies_met(d))
                    .collect()
            };
            for dependent in ready {
                let _ = self.work_tx.send(dependent);
            }

            if self.ctx.complete_one() {
                debug!(worker, "last node completed");
                self.ctx.finish();
                return;
            }
        }
    }
}
