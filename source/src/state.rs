use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::generation::ParamGen;

/// How many returns are kept around by default.
pub const DEFAULT_RETURNS_CAPACITY: usize = 4096;

/// The state shared by every connection of a parameter source.
///
/// Snapshots are reference counted, a fetch in flight keeps sending the
/// snapshot it started with even if a newer one is published meanwhile.
pub struct SourceState {
    snapshot: RwLock<Arc<[f64]>>,
    generator: Mutex<Box<dyn ParamGen>>,
    len: usize,
    refresh_on_fetch: bool,
    signals: Mutex<VecDeque<Vec<u8>>>,
    returns: Mutex<VecDeque<f64>>,
    returns_capacity: usize,
    returns_count: AtomicU64,
    fetches: AtomicU64,
}

impl SourceState {
    /// Creates a new `SourceState` with a first snapshot drawn from `generator`.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters per snapshot.
    /// * `generator` - Produces the snapshots.
    pub fn new(len: usize, mut generator: Box<dyn ParamGen>) -> Self {
        let mut values = vec![0.; len];
        generator.fill(&mut values);

        Self {
            snapshot: RwLock::new(values.into()),
            generator: Mutex::new(generator),
            len,
            refresh_on_fetch: false,
            signals: Mutex::new(VecDeque::new()),
            returns: Mutex::new(VecDeque::new()),
            returns_capacity: DEFAULT_RETURNS_CAPACITY,
            returns_count: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Regenerates the snapshot before answering every fetch.
    pub fn with_refresh_on_fetch(mut self, refresh_on_fetch: bool) -> Self {
        self.refresh_on_fetch = refresh_on_fetch;
        self
    }

    /// Bounds the returns log, older returns are dropped first.
    pub fn with_returns_capacity(mut self, capacity: usize) -> Self {
        self.returns_capacity = capacity;
        self
    }

    pub fn refresh_on_fetch(&self) -> bool {
        self.refresh_on_fetch
    }

    /// Replaces the current snapshot.
    ///
    /// # Arguments
    /// * `values` - The new snapshot, it may change the parameter count.
    pub fn publish(&self, values: Vec<f64>) {
        debug!(len = values.len(); "publishing snapshot");
        *self.snapshot.write() = values.into();
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<[f64]> {
        Arc::clone(&self.snapshot.read())
    }

    /// The current snapshot, counted as served to a worker.
    pub(crate) fn fetch(&self) -> Arc<[f64]> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.snapshot()
    }

    /// Draws a new snapshot from the generator and publishes it.
    ///
    /// Runs on the calling thread, large snapshots should be refreshed off
    /// the async runtime.
    pub fn refresh(&self) {
        let mut values = vec![0.; self.len];
        self.generator.lock().fill(&mut values);
        self.publish(values);
    }

    /// Queues a signal for the next worker that polls.
    pub fn push_signal(&self, signal: impl Into<Vec<u8>>) {
        self.signals.lock().push_back(signal.into());
    }

    pub(crate) fn pop_signal(&self) -> Option<Vec<u8>> {
        self.signals.lock().pop_front()
    }

    pub(crate) fn record_returns(&self, value: f64) {
        let mut returns = self.returns.lock();
        if returns.len() == self.returns_capacity {
            returns.pop_front();
        }

        if self.returns_capacity > 0 {
            returns.push_back(value);
        }

        self.returns_count.fetch_add(1, Ordering::Relaxed);
    }

    /// The most recent returns, oldest first.
    pub fn returns(&self) -> Vec<f64> {
        self.returns.lock().iter().copied().collect()
    }

    /// Every return received so far, including the ones dropped from the log.
    pub fn returns_count(&self) -> u64 {
        self.returns_count.load(Ordering::Relaxed)
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}
