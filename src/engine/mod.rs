// src/engine/mod.rs

//! Execution engines for dependency graphs.
//!
//! Every engine turns a model's schedule into a dependency graph (cached in a
//! [`GraphCache`]) and runs it on a [`WorkerPool`]:
//! - [`cross_iteration`]: one shared queue over the fully unrolled graph
//! - [`static_queue`]: one shared queue reseeded every iteration, countdown
//!   counters and per-worker sentinels marking the end of the iteration
//! - [`phase`]: phases run one after another, each split across per-worker
//!   queues with work stealing
//!
//! [`MultithreadingManager`] picks the engine and owns the pool and the
//! per-node locks. [`sequential`] is the single-threaded reference path.

use std::fmt;

use crate::errors::Result;
use crate::model::FactorModel;
use crate::schedule::ScheduleEntry;
use crate::types::EngineMode;

pub mod cache;
pub mod context;
pub mod cross_iteration;
pub mod locks;
pub mod manager;
pub mod phase;
pub mod pool;
pub mod sequential;
pub mod static_queue;
pub mod worker;

pub use cache::{GraphCache, GraphVersion};
pub use context::RunContext;
pub use cross_iteration::CrossIterationEngine;
pub use locks::NodeLocks;
pub use manager::{MultithreadingManager, MultithreadingOptions};
pub use phase::PhaseEngine;
pub use pool::WorkerPool;
pub use sequential::run_sequential;
pub use static_queue::StaticQueueEngine;

/// A strategy for running a model's schedule in parallel.
///
/// Engines are driven by the manager: `prepare` builds or reuses the graph
/// for the given inputs and has no other effect; `run` executes `iterations`
/// full iterations and returns once every entry ran or a worker failed.
pub trait ExecutionEngine: Send + fmt::Debug {
    fn mode(&self) -> EngineMode;

    fn prepare(&mut self, model: &dyn FactorModel, iterations: usize) -> Result<()>;

    fn run(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
        pool: &mut WorkerPool,
        locks: &NodeLocks,
    ) -> Result<()>;

    /// Entries grouped into mutually independent phases, in order.
    fn phases(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
    ) -> Result<Vec<Vec<ScheduleEntry>>>;

    /// How many graphs this engine has built so far.
    fn graph_builds(&self) -> usize;
}

/// A fresh engine for `mode`.
pub fn engine_for(mode: EngineMode) -> Box<dyn ExecutionEngine> {
    match mode {
        EngineMode::CrossIteration => Box::new(CrossIterationEngine::new()),
        EngineMode::Static => Box::new(StaticQueueEngine::new()),
        EngineMode::Phase => Box::new(PhaseEngine::new()),
    }
}
