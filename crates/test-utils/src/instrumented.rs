use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use mtsched::model::{FactorModel, NodeId};
use mtsched::schedule::{Schedule, ScheduleEntry};

/// Ids handed to wrappers serving their own schedule, kept clear of the ids
/// real models draw from.
static OVERRIDE_IDS: AtomicU64 = AtomicU64::new(1 << 63);

/// Wraps a model and records how the engine drives it.
///
/// - counts every `update` per entry and in total
/// - keeps the global update order
/// - flags two updates touching the same node at the same time
/// - can fail (or panic) on the k-th update, counting from 1
pub struct InstrumentedModel<M> {
    inner: M,
    id: u64,
    busy: Vec<AtomicBool>,
    overlap: AtomicBool,
    running: AtomicUsize,
    peak: AtomicUsize,
    updates: AtomicUsize,
    firings: Mutex<HashMap<ScheduleEntry, usize>>,
    log: Mutex<Vec<ScheduleEntry>>,
    threads: Mutex<HashSet<ThreadId>>,
    fail_on: Option<usize>,
    panic_on: Option<usize>,
    delay: Option<Duration>,
    schedule_override: Option<Schedule>,
}

impl<M: FactorModel> InstrumentedModel<M> {
    pub fn new(inner: M) -> Self {
        let busy = (0..inner.node_count()).map(|_| AtomicBool::new(false)).collect();
        Self {
            id: inner.model_id(),
            inner,
            busy,
            overlap: AtomicBool::new(false),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            firings: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
            threads: Mutex::new(HashSet::new()),
            fail_on: None,
            panic_on: None,
            delay: None,
            schedule_override: None,
        }
    }

    /// Return an error from the `k`-th update.
    pub fn fail_on(mut self, k: usize) -> Self {
        self.fail_on = Some(k);
        self
    }

    /// Panic inside the `k`-th update.
    pub fn panic_on(mut self, k: usize) -> Self {
        self.panic_on = Some(k);
        self
    }

    /// Sleep this long inside every update to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serve this schedule instead of the inner model's (e.g. a dynamic one).
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule_override = Some(schedule);
        self.id = OVERRIDE_IDS.fetch_add(1, Ordering::Relaxed);
        self
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn total_updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn firings_of(&self, entry: &ScheduleEntry) -> usize {
        self.firings.lock().get(entry).copied().unwrap_or(0)
    }

    /// Entries in the order their updates started.
    pub fn log(&self) -> Vec<ScheduleEntry> {
        self.log.lock().clone()
    }

    /// Number of distinct threads that have run an update.
    pub fn update_threads(&self) -> usize {
        self.threads.lock().len()
    }

    /// Whether two updates ever touched the same node concurrently.
    pub fn overlap_detected(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }

    /// Most updates observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl<M: FactorModel> FactorModel for InstrumentedModel<M> {
    fn model_id(&self) -> u64 {
        self.id
    }

    fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    fn siblings(&self, node: NodeId) -> &[NodeId] {
        self.inner.siblings(node)
    }

    fn port_num(&self, node: NodeId, sibling: NodeId) -> Option<usize> {
        self.inner.port_num(node, sibling)
    }

    fn structure_version(&self) -> u64 {
        self.inner.structure_version()
    }

    fn schedule(&self) -> &Schedule {
        self.schedule_override
            .as_ref()
            .unwrap_or_else(|| self.inner.schedule())
    }

    fn schedule_version(&self) -> u64 {
        self.inner.schedule_version()
    }

    fn node_name(&self, node: NodeId) -> String {
        self.inner.node_name(node)
    }

    fn update(&self, entry: &ScheduleEntry) -> anyhow::Result<()> {
        let k = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().push(entry.clone());
        self.threads.lock().insert(thread::current().id());
        *self.firings.lock().entry(entry.clone()).or_default() += 1;

        let nodes = entry.touched_nodes();
        for node in &nodes {
            if self.busy[node.0].swap(true, Ordering::SeqCst) {
                self.overlap.store(true, Ordering::SeqCst);
            }
        }
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let result = if self.fail_on == Some(k) {
            Err(anyhow::anyhow!("injected failure on update #{k}"))
        } else {
            self.inner.update(entry)
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        for node in &nodes {
            self.busy[node.0].store(false, Ordering::SeqCst);
        }

        if self.panic_on == Some(k) {
            panic!("injected panic on update #{k}");
        }
        result
    }
}
