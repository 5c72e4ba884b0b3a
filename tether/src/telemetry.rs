//! Await-readiness counters.
//!
//! Every readiness check made by an [`Awaitable`](crate::Awaitable) reports
//! one of three outcomes:
//! - a deferred awaitable whose result had already been published,
//! - a deferred awaitable that had to register as a waiter,
//! - an immediate awaitable.
//!
//! The built-in [`Stats`] collector counts them process-wide; an additional
//! [`Observer`] can be installed once with [`set_observer`]. Nothing in the
//! crate reads these numbers back, they exist for diagnostics only.
//!
//! With the `telemetry` feature disabled the hooks compile to nothing and
//! [`snapshot`] always returns zeros.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives one call per readiness check.
pub trait Observer: Send + Sync {
    /// A deferred awaitable found its result already published.
    fn awaitable_ready(&self);

    /// A deferred awaitable found its result pending and will register.
    fn awaitable_need_to_wait(&self);

    /// An immediate awaitable was checked.
    fn immediate_ready(&self);
}

/// Lock-free counters for the three readiness outcomes.
#[derive(Debug, Default)]
pub struct Stats {
    awaitable_ready: AtomicUsize,
    awaitable_need_to_wait: AtomicUsize,
    immediate_ready: AtomicUsize,
}

impl Stats {
    /// Creates a zeroed collector.
    pub const fn new() -> Self {
        Self {
            awaitable_ready: AtomicUsize::new(0),
            awaitable_need_to_wait: AtomicUsize::new(0),
            immediate_ready: AtomicUsize::new(0),
        }
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            awaitable_ready: self.awaitable_ready.load(Ordering::Relaxed),
            awaitable_need_to_wait: self.awaitable_need_to_wait.load(Ordering::Relaxed),
            immediate_ready: self.immediate_ready.load(Ordering::Relaxed),
        }
    }
}

impl Observer for Stats {
    fn awaitable_ready(&self) {
        self.awaitable_ready.fetch_add(1, Ordering::Relaxed);
    }

    fn awaitable_need_to_wait(&self) {
        self.awaitable_need_to_wait.fetch_add(1, Ordering::Relaxed);
    }

    fn immediate_ready(&self) {
        self.immediate_ready.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub awaitable_ready: usize,
    pub awaitable_need_to_wait: usize,
    pub immediate_ready: usize,
}

static STATS: Stats = Stats::new();
static OBSERVER: OnceLock<Box<dyn Observer>> = OnceLock::new();

/// Returns the process-wide counters.
pub fn snapshot() -> Snapshot {
    STATS.snapshot()
}

/// Installs an extra observer for the rest of the process.
///
/// Only the first call succeeds; later calls hand the observer back.
pub fn set_observer(observer: Box<dyn Observer>) -> Result<(), Box<dyn Observer>> {
    OBSERVER.set(observer)
}

#[cfg(feature = "telemetry")]
fn each(f: impl Fn(&dyn Observer)) {
    f(&STATS);

    if let Some(observer) = OBSERVER.get() {
        f(observer.as_ref());
    }
}

#[cfg(feature = "telemetry")]
pub(crate) fn awaitable_ready() {
    each(|o| o.awaitable_ready());
}

#[cfg(feature = "telemetry")]
pub(crate) fn awaitable_need_to_wait() {
    each(|o| o.awaitable_need_to_wait());
}

#[cfg(feature = "telemetry")]
pub(crate) fn immediate_ready() {
    each(|o| o.immediate_ready());
}

#[cfg(not(feature = "telemetry"))]
#[inline(always)]
pub(crate) fn awaitable_ready() {}

#[cfg(not(feature = "telemetry"))]
#[inline(always)]
pub(crate) fn awaitable_need_to_wait() {}

#[cfg(not(feature = "telemetry"))]
#[inline(always)]
pub(crate) fn immediate_ready() {}
