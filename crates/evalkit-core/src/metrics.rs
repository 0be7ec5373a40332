//! Global atomic counters for evalkit observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. when a command exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. No allocations and no locking.
pub struct Metrics {
    runs_executed: AtomicU64,
    runs_resumed: AtomicU64,
    records_validated: AtomicU64,
    validation_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_executed: AtomicU64::new(0),
            runs_resumed: AtomicU64::new(0),
            records_validated: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
        }
    }

    /// Increment the runs-executed counter by one.
    pub fn inc_runs_executed(&self) {
        self.runs_executed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_executed", "counter incremented");
    }

    /// Add repetitions skipped because the log already held them.
    pub fn add_runs_resumed(&self, n: u64) {
        self.runs_resumed.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "runs_resumed", n, "counter incremented");
    }

    /// Increment the records-validated counter, and the failure counter when
    /// the record did not pass.
    pub fn inc_records_validated(&self, passed: bool) {
        self.records_validated.fetch_add(1, Ordering::Relaxed);
        if !passed {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "records_validated", passed, "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_executed = self.runs_executed(),
            runs_resumed = self.runs_resumed(),
            records_validated = self.records_validated(),
            validation_failures = self.validation_failures(),
        );
    }

    pub fn runs_executed(&self) -> u64 {
        self.runs_executed.load(Ordering::Relaxed)
    }

    pub fn runs_resumed(&self) -> u64 {
        self.runs_resumed.load(Ordering::Relaxed)
    }

    pub fn records_validated(&self) -> u64 {
        self.records_validated.load(Ordering::Relaxed)
    }

    pub fn validation_failures(&self) -> u64 {
        self.validation_failures.load(Ordering::Relaxed)
    }
}
