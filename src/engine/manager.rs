// src/engine/manager.rs

use tracing::{debug, info, info_span};

use crate::engine::locks::NodeLocks;
use crate::engine::pool::WorkerPool;
use crate::engine::sequential::run_sequential;
use crate::engine::{ExecutionEngine, engine_for};
use crate::errors::Result;
use crate::model::FactorModel;
use crate::schedule::ScheduleEntry;
use crate::types::EngineMode;

/// Programmatic counterpart of the `[config]` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultithreadingOptions {
    pub mode: EngineMode,
    pub workers: usize,
    /// When false, `iterate` runs sequentially on the calling thread.
    pub enabled: bool,
}

impl Default for MultithreadingOptions {
    fn default() -> Self {
        Self {
            mode: EngineMode::default(),
            workers: num_cpus::get(),
            enabled: true,
        }
    }
}

/// Controller that runs a model's schedule through the selected engine.
///
/// Owns the worker pool and the per-node locks, and keeps the engine (with
/// its cached graph) across calls so unchanged inputs are not rebuilt.
#[derive(Debug)]
pub struct MultithreadingManager {
    engine: Box<dyn ExecutionEngine>,
    pool: WorkerPool,
    locks: NodeLocks,
    enabled: bool,
}

impl Default for MultithreadingManager {
    fn default() -> Self {
        Self::new(MultithreadingOptions::default())
    }
}

impl MultithreadingManager {
    pub fn new(options: MultithreadingOptions) -> Self {
        Self {
            engine: engine_for(options.mode),
            pool: WorkerPool::new(options.workers),
            locks: NodeLocks::default(),
            enabled: options.enabled,
        }
    }

    pub fn mode(&self) -> EngineMode {
        self.engine.mode()
    }

    /// Switch engines. The old engine's cached graph is dropped.
    pub fn set_mode(&mut self, mode: EngineMode) {
        if mode != self.engine.mode() {
            debug!(from = %self.engine.mode(), to = %mode, "switching engine");
            self.engine = engine_for(mode);
        }
    }

    pub fn num_workers(&self) -> usize {
        self.pool.workers()
    }

    pub fn set_num_workers(&mut self, workers: usize) {
        self.pool.set_workers(workers);
    }

    pub fn use_multithreading(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_multithreading(&self) -> bool {
        self.enabled
    }

    /// Build the engine's graph for `model` and `iterations`, or keep the
    /// cached one if nothing changed. Has no other effect.
    pub fn prepare_for_multithreading(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
    ) -> Result<()> {
        self.engine.prepare(model, iterations)
    }

    /// Run `iterations` iterations of `model`'s schedule.
    ///
    /// Returns once every entry ran, or with the first worker failure after
    /// all workers stopped. Messages written before a failure are kept.
    pub fn iterate(&mut self, model: &dyn FactorModel, iterations: usize) -> Result<()> {
        if iterations == 0 {
            return Ok(());
        }
        if !self.enabled {
            info!(iterations, "iterate (sequential)");
            return run_sequential(model, iterations);
        }

        let _span = info_span!(
            "iterate",
            mode = %self.engine.mode(),
            workers = self.pool.workers(),
        )
        .entered();
        self.engine.prepare(model, iterations)?;
        self.locks
            .ensure(model.node_count(), model.structure_version());

        info!(iterations, "iterate");
        self.engine
            .run(model, iterations, &mut self.pool, &self.locks)
    }

    /// The current engine's phases for `model`.
    pub fn phases(
        &mut self,
        model: &dyn FactorModel,
        iterations: usize,
    ) -> Result<Vec<Vec<ScheduleEntry>>> {
        self.engine.phases(model, iterations)
    }

    /// Graph (re)builds performed by the current engine.
    pub fn graph_builds(&self) -> usize {
        self.engine.graph_builds()
    }
}
