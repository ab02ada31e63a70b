// src/engine/context.rs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};
use tracing::error;

use crate::errors::{MtschedError, Result};

/// Shared state of one engine run, handed by reference to every worker.
///
/// Holds the outstanding-work countdown, the first worker failure, and the
/// completion monitor the controlling thread waits on. Nothing here is
/// global, so independent runs on independent graphs do not interfere.
#[derive(Debug)]
pub struct RunContext {
    remaining: AtomicUsize,
    aborted: AtomicBool,
    failure: Mutex<Option<MtschedError>>,
    done: Mutex<bool>,
    signal: Condvar,
}

impl RunContext {
    pub fn new(total: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(total),
            aborted: AtomicBool::new(false),
            failure: Mutex::new(None),
            done: Mutex::new(total == 0),
            signal: Condvar::new(),
        }
    }

    /// Re-arm the countdown for another pass over `total` units of work.
    /// Must not be called while workers are still counting down.
    pub fn restart(&self, total: usize) {
        self.remaining.store(total, Ordering::Release);
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Count one finished unit of work. Returns `true` for the call that
    /// brought the countdown to zero.
    pub fn complete_one(&self) -> bool {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "run countdown underflowed");
        previous == 1
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Store `err` unless an earlier failure is already recorded, mark the run
    /// aborted and wake the controller. Returns `true` if `err` was kept.
    pub fn fail(&self, err: MtschedError) -> bool {
        let kept = {
            let mut slot = self.failure.lock();
            if slot.is_none() {
                error!(error = %err, "aborting run after worker failure");
                *slot = Some(err);
                true
            } else {
                false
            }
        };
        self.aborted.store(true, Ordering::Release);
        self.finish();
        kept
    }

    /// Wake the controller.
    pub fn finish(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.signal.notify_all();
    }

    /// Block until [`finish`](Self::finish) or [`fail`](Self::fail) is called.
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.signal.wait(&mut done);
        }
    }

    /// `Err` with the recorded failure, if any.
    pub fn take_result(&self) -> Result<()> {
        match self.failure.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
