// src/engine/sequential.rs

use tracing::debug;

use crate::engine::locks::NodeLocks;
use crate::engine::worker::run_entry;
use crate::errors::Result;
use crate::model::FactorModel;

/// Run `iterations` iterations on the calling thread: every leaf entry of
/// the schedule in order, sub-schedules expanded in place.
///
/// This is the reference every parallel engine must agree with. Dynamic
/// schedules are accepted here since nothing is built ahead of time.
/// Failures surface exactly as they do from a parallel run, with worker 0.
pub fn run_sequential(model: &dyn FactorModel, iterations: usize) -> Result<()> {
    let schedule = model.schedule();
    let entries = schedule.leaf_entries();
    for entry in &entries {
        entry.touched_ports(model)?;
    }
    let locks = NodeLocks::new(model.node_count());

    for iteration in 0..iterations {
        for entry in &entries {
            run_entry(model, entry, &locks, 0)?;
        }
        debug!(iteration, entries = entries.len(), "sequential iteration finished");
    }
    Ok(())
}
