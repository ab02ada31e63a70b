// src/engine/pool.rs

use std::fmt;
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{Span, debug, info_span};

use crate::errors::{MtschedError, Result};

/// Worker configuration shared by every engine.
///
/// The queue engines spawn `workers` scoped threads per run; the phase
/// engine submits its per-worker jobs to a rayon pool of the same size,
/// built on first use and rebuilt when the worker count changes.
pub struct WorkerPool {
    workers: usize,
    rayon: Option<ThreadPool>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("rayon_built", &self.rayon.is_some())
            .finish()
    }
}

impl WorkerPool {
    /// A pool of `workers` threads; zero is bumped to one.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            rayon: None,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn set_workers(&mut self, workers: usize) {
        let workers = workers.max(1);
        if workers != self.workers {
            self.workers = workers;
            self.rayon = None;
        }
    }

    /// The rayon pool, built on first call.
    pub fn rayon(&mut self) -> Result<&ThreadPool> {
        let pool = match self.rayon.take() {
            Some(pool) => pool,
            None => {
                let pool = ThreadPoolBuilder::new()
                    .num_threads(self.workers)
                    .thread_name(|i| format!("mtsched-phase-{i}"))
                    .build()
                    .map_err(|e| anyhow::anyhow!("failed to build worker pool: {e}"))?;
                debug!(workers = self.workers, "rayon worker pool built");
                pool
            }
        };
        Ok(self.rayon.insert(pool))
    }
}

/// Spawn one named scoped thread per worker, each running `body(worker)`
/// inside a `worker` span under the caller's current span.
pub(crate) fn spawn_workers<'scope, 'env, F>(
    scope: &'scope Scope<'scope, 'env>,
    prefix: &str,
    workers: usize,
    body: F,
) -> Result<Vec<ScopedJoinHandle<'scope, ()>>>
where
    F: Fn(usize) + Send + Sync + 'scope,
{
    let body = Arc::new(body);
    let parent = Span::current();
    (0..workers)
        .map(|worker| {
            let body = Arc::clone(&body);
            let span = info_span!(parent: &parent, "worker", worker);
            thread::Builder::new()
                .name(format!("{prefix}-{worker}"))
                .spawn_scoped(scope, move || span.in_scope(|| body(worker)))
                .map_err(MtschedError::from)
        })
        .collect()
}
