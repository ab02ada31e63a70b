// src/engine/worker.rs

//! The per-entry step every engine's workers share.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{trace, warn};

use crate::engine::locks::NodeLocks;
use crate::errors::{MtschedError, Result};
use crate::model::FactorModel;
use crate::schedule::ScheduleEntry;

/// Run one entry's `update` with its node locks held.
///
/// An `Err` from the model becomes [`MtschedError::WorkerFailed`]; a panic
/// inside `update` is caught and becomes [`MtschedError::WorkerPanicked`].
/// Locks are released before this returns either way.
pub fn run_entry(
    model: &dyn FactorModel,
    entry: &ScheduleEntry,
    locks: &NodeLocks,
    worker: usize,
) -> Result<()> {
    trace!(worker, %entry, "updating");
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let _guards = locks.lock_all(&entry.touched_nodes());
        model.update(entry)
    }));

    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => {
            let entry = entry.describe(model);
            warn!(worker, %entry, error = %source, "update failed");
            Err(MtschedError::WorkerFailed {
                entry,
                worker,
                source,
            })
        }
        Err(payload) => {
            let entry = entry.describe(model);
            let message = panic_message(payload.as_ref());
            warn!(worker, %entry, %message, "update panicked");
            Err(MtschedError::WorkerPanicked {
                entry,
                worker,
                message,
            })
        }
    }
}

/// Run a worker's loop, turning a panic that escapes it (outside any
/// `update`) into an error.
pub(crate) fn guard_loop<F: FnOnce()>(worker: usize, body: F) -> Option<MtschedError> {
    panic::catch_unwind(AssertUnwindSafe(body))
        .err()
        .map(|payload| MtschedError::WorkerPanicked {
            entry: "<engine bookkeeping>".to_string(),
            worker,
            message: panic_message(payload.as_ref()),
        })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
