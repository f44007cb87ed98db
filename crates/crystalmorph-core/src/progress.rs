//! Progress reporting.
//!
//! Pipelines report `(completed, total)` through a [`ProgressSink`] after each
//! unit of work finishes. Workers share one [`ProgressTracker`], which keeps
//! the count monotonic no matter which thread finishes first.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Receiver of progress updates.
pub trait ProgressSink: Send + Sync {
    /// Called once per finished unit; `completed` never decreases.
    fn report(&self, completed: usize, total: usize);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn report(&self, completed: usize, total: usize) {
        self(completed, total);
    }
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _completed: usize, _total: usize) {}
}

/// Shared completion counter.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    total: usize,
    completed: Mutex<usize>,
    snapshot: AtomicUsize,
}

impl<'a> ProgressTracker<'a> {
    /// Track `total` units, forwarding to `sink`.
    pub fn new(sink: &'a dyn ProgressSink, total: usize) -> Self {
        Self {
            sink,
            total,
            completed: Mutex::new(0),
            snapshot: AtomicUsize::new(0),
        }
    }

    /// Mark one unit finished and notify the sink.
    pub fn tick(&self) {
        // Lock is held across the callback: the sink sees updates in order
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        self.snapshot.store(*completed, Ordering::Release);
        self.sink.report(*completed, self.total);
    }

    /// Units finished so far.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.snapshot.load(Ordering::Acquire)
    }

    /// Fraction finished in `[0, 1]`; an empty batch counts as done.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed() as f64 / self.total as f64
    }
}
