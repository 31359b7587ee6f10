//! Process-wide consensus counters.
//!
//! Incremented at the call site with relaxed atomics; [`Metrics::flush`]
//! logs a snapshot as one `info!` event (the CLI calls it on exit).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    requests: AtomicU64,
    worker_successes: AtomicU64,
    worker_failures: AtomicU64,
    quorum_failures: AtomicU64,
    enrichment_failures: AtomicU64,
    rows_recorded: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub worker_successes: u64,
    pub worker_failures: u64,
    pub quorum_failures: u64,
    pub enrichment_failures: u64,
    pub rows_recorded: u64,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
            worker_successes: AtomicU64::new(0),
            worker_failures: AtomicU64::new(0),
            quorum_failures: AtomicU64::new(0),
            enrichment_failures: AtomicU64::new(0),
            rows_recorded: AtomicU64::new(0),
        }
    }

    pub fn inc_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_worker_success(&self) {
        self.worker_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_worker_failure(&self) {
        self.worker_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_quorum_failure(&self) {
        self.quorum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_enrichment_failure(&self) {
        self.enrichment_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "enrichment_failures", "counter incremented");
    }

    pub fn inc_rows_recorded(&self) {
        self.rows_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            worker_successes: self.worker_successes.load(Ordering::Relaxed),
            worker_failures: self.worker_failures.load(Ordering::Relaxed),
            quorum_failures: self.quorum_failures.load(Ordering::Relaxed),
            enrichment_failures: self.enrichment_failures.load(Ordering::Relaxed),
            rows_recorded: self.rows_recorded.load(Ordering::Relaxed),
        }
    }

    /// Log every counter as a single `info!` event.
    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            metric = "flush",
            requests = s.requests,
            worker_successes = s.worker_successes,
            worker_failures = s.worker_failures,
            quorum_failures = s.quorum_failures,
            enrichment_failures = s.enrichment_failures,
            rows_recorded = s.rows_recorded,
        );
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.requests,
            &self.worker_successes,
            &self.worker_failures,
            &self.quorum_failures,
            &self.enrichment_failures,
            &self.rows_recorded,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
