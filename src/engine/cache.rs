// src/engine/cache.rs

use tracing::debug;

use crate::errors::Result;
use crate::model::FactorModel;

/// Inputs a built dependency graph was derived from. A graph is reused only
/// for the same model instance while its versions and the iteration count
/// are unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphVersion {
    pub model: u64,
    pub structure: u64,
    pub schedule: u64,
    pub iterations: usize,
}

impl GraphVersion {
    pub fn of(model: &dyn FactorModel, iterations: usize) -> Self {
        Self {
            model: model.model_id(),
            structure: model.structure_version(),
            schedule: model.schedule_version(),
            iterations,
        }
    }
}

/// Single-slot cache holding the last graph an engine built.
#[derive(Debug)]
pub struct GraphCache<G> {
    slot: Option<(GraphVersion, G)>,
    builds: usize,
}

impl<G> Default for GraphCache<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> GraphCache<G> {
    pub fn new() -> Self {
        Self {
            slot: None,
            builds: 0,
        }
    }

    /// The cached graph for `version`, building it with `build` on a miss.
    /// A failed build leaves the cache empty.
    pub fn get_or_build<F>(&mut self, version: GraphVersion, build: F) -> Result<&G>
    where
        F: FnOnce() -> Result<G>,
    {
        let graph = match self.slot.take() {
            Some((cached, graph)) if cached == version => graph,
            stale => {
                if let Some((cached, _)) = stale {
                    debug!(?cached, ?version, "graph cache stale; rebuilding");
                } else {
                    debug!(?version, "graph cache miss; building");
                }
                let graph = build()?;
                self.builds += 1;
                graph
            }
        };
        Ok(&self.slot.insert((version, graph)).1)
    }

    /// How many times a graph has been (re)built.
    pub fn builds(&self) -> usize {
        self.builds
    }
}
