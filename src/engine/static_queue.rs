// src/engine/static_queue.rs

//! Single shared queue over the per-iteration graph, re-run every iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

use crate::dag::{NodeIndex, StaticDependencyGraph};
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

/// Queue item: a ready node, or the end-of-iteration marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkItem {
    Entry(NodeIndex),
    Sentinel,
}

/// Builds one iteration's graph and replays it `iterations` times.
///
/// The graph does not depend on the iteration count, so it is cached
/// against the model and schedule versions only.
#[derive(Debug, Default)]
pub struct StaticQueueEngine {
    cache: GraphCache<StaticDependencyGraph>,
}

impl StaticQueueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&mut self, model: &dyn FactorModel) -> Result<&StaticDependencyGraph> {
        static_graph(&mut self.cache, model)
    }
}

/// Shared with the phase engine, which runs the same per-iteration graph.
pub(crate) fn static_graph<'c>(
    cache: &'c mut GraphCache<StaticDependencyGraph>,
    model: &dyn FactorModel,
) -> Result<&'c StaticDependencyGraph> {
    cache.get_or_build(GraphVersion::of(model, 1), || {
        StaticDependencyGraph::build(model, model.schedule())
    })
}

impl ExecutionEngine for StaticQueueEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Static
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
        let graph = self.graph(model)?;
        graph.reset_counters();

        info!(
            workers,
            iterations,
            nodes = graph.node_count(),
            initial = graph.initial_entries().len(),
            "static run started"
        );
        run_iterations(graph, model, locks, workers, iterations)
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

/// Run `iterations` iterations of `graph` on `workers` threads that live
/// for the whole call.
///
/// Each iteration seeds the queue with the graph's initial entries. A worker
/// that finishes a node counts down each dependent and enqueues those
/// reaching zero. The iteration ends when its last node completes or an
/// update fails: one sentinel per worker is enqueued, and a worker that
/// dequeues one parks at the iteration gate. Once every live worker is parked
/// the controller reseeds the queue and reopens the gate, or closes it after
/// the last iteration or a failure.
pub fn run_iterations(
    graph: &StaticDependencyGraph,
    model: &dyn FactorModel,
    locks: &NodeLocks,
    workers: usize,
    iterations: usize,
) -> Result<()> {
    if graph.node_count() == 0 || iterations == 0 {
        return Ok(());
    }

    let ctx = RunContext::new(graph.node_count());
    let gate = IterationGate::new(workers);
    let ended = AtomicBool::new(false);
    let (tx, rx) = unbounded::<WorkItem>();

    thread::scope(|scope| {
        let shared = Shared {
            graph,
            model,
            locks,
            ctx: &ctx,
            gate: &gate,
            ended: &ended,
            tx: &tx,
            rx: &rx,
            workers,
        };
        let spawned = spawn_workers(scope, "mtsched-static", workers, move |worker| {
            if let Some(err) = guard_loop(worker, || shared.worker_loop(worker)) {
                shared.ctx.fail(err);
                shared.end_iteration();
                shared.gate.leave();
            }
        });
        if let Err(err) = spawned {
            ctx.fail(err);
            shared.end_iteration();
            gate.close();
            return;
        }

        let mut iteration = 0;
        shared.seed();
        loop {
            gate.wait_for_workers();
            if ctx.is_aborted() {
                break;
            }
            debug!(iteration, "static iteration finished");
            iteration += 1;
            if iteration == iterations {
                break;
            }
            ctx.restart(graph.node_count());
            ended.store(false, Ordering::Release);
            shared.seed();
            gate.open();
        }
        gate.close();
    });

    if ctx.is_aborted() {
        // Counters of unfinished nodes are half-way; start the next run clean.
        graph.reset_counters();
    }
    ctx.take_result()
}

#[derive(Clone, Copy)]
struct Shared<'a> {
    graph: &'a StaticDependencyGraph,
    model: &'a dyn FactorModel,
    locks: &'a NodeLocks,
    ctx: &'a RunContext,
    gate: &'a IterationGate,
    ended: &'a AtomicBool,
    tx: &'a Sender<WorkItem>,
    rx: &'a Receiver<WorkItem>,
    workers: usize,
}

impl Shared<'_> {
    fn seed(&self) {
        for &index in self.graph.initial_entries() {
            // The receiver outlives every sender use.
            let _ = self.tx.send(WorkItem::Entry(index));
        }
    }

    /// Enqueue one sentinel per worker, once per iteration.
    fn end_iteration(&self) {
        if self
            .ended
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            for _ in 0..self.workers {
                let _ = self.tx.send(WorkItem::Sentinel);
            }
        }
    }

    fn worker_loop(&self, worker: usize) {
        while let Ok(item) = self.rx.recv() {
            let index = match item {
                WorkItem::Sentinel => {
                    if self.gate.arrive() {
                        continue;
                    }
                    return;
                }
                WorkItem::Entry(index) => index,
            };
            if self.ctx.is_aborted() {
                // Drain until the sentinel arrives.
                continue;
            }

            let entry = self.graph.graph().payload(index);
            if let Err(err) = run_entry(self.model, entry, self.locks, worker) {
                self.ctx.fail(err);
                self.end_iteration();
                continue;
            }

            for dependent in self.graph.graph().node(index).dependents() {
                if self.graph.release_dependency(dependent) {
                    let _ = self.tx.send(WorkItem::Entry(dependent));
                }
            }

            if self.ctx.complete_one() {
                self.end_iteration();
            }
        }
    }
}

/// Rendezvous between the controller and the workers between iterations.
#[derive(Debug)]
struct IterationGate {
    state: Mutex<GateState>,
    turn: Condvar,
}

#[derive(Debug)]
struct GateState {
    live: usize,
    arrived: usize,
    generation: u64,
    closed: bool,
}

impl IterationGate {
    fn new(workers: usize) -> Self {
        Self {
            state: Mutex::new(GateState {
                live: workers,
                arrived: 0,
                generation: 0,
                closed: false,
            }),
            turn: Condvar::new(),
        }
    }

    /// Park until the controller opens the next iteration. Returns `false`
    /// once the gate is closed.
    fn arrive(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }
        state.arrived += 1;
        let generation = state.generation;
        self.turn.notify_all();
        while state.generation == generation {
            self.turn.wait(&mut state);
        }
        !state.closed
    }

    /// A worker that died no longer counts towards the rendezvous.
    fn leave(&self) {
        let mut state = self.state.lock();
        state.live = state.live.saturating_sub(1);
        self.turn.notify_all();
    }

    fn wait_for_workers(&self) {
        let mut state = self.state.lock();
        while state.arrived < state.live {
            self.turn.wait(&mut state);
        }
    }

    fn open(&self) {
        let mut state = self.state.lock();
        state.arrived = 0;
        state.generation += 1;
        self.turn.notify_all();
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.generation += 1;
        self.turn.notify_all();
    }
}
