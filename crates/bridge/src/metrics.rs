//! Per-bridge counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::CallOutcome;

/// Lock-free counters owned by one bridge instance
#[derive(Debug, Default)]
pub struct BridgeMetrics {
    /// Top-level calls issued
    calls: AtomicU64,
    /// Endpoint turns ending in `finished`
    finished: AtomicU64,
    /// Endpoint turns ending in `python_exit`
    disconnected: AtomicU64,
    /// Endpoint turns ending in a failure
    broken: AtomicU64,
    sub_requests: AtomicU64,
    controller_errors: AtomicU64,
    fragments_sent: AtomicU64,
    fragment_failures: AtomicU64,
    side_channel_requests: AtomicU64,
    connects: AtomicU64,
}

impl BridgeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_calls(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one endpoint turn by outcome
    pub fn record_outcome(&self, outcome: CallOutcome) {
        let counter = match outcome {
            CallOutcome::Finished => &self.finished,
            CallOutcome::Disconnected => &self.disconnected,
            CallOutcome::TimedOut | CallOutcome::TransportError | CallOutcome::Desync => {
                &self.broken
            }
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sub_requests(&self) {
        self.sub_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_controller_errors(&self) {
        self.controller_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_fragments_sent(&self, n: usize) {
        self.fragments_sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn inc_fragment_failures(&self) {
        self.fragment_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_side_channel_requests(&self) {
        self.side_channel_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_connects(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            finished: self.finished.load(Ordering::Relaxed),
            disconnected: self.disconnected.load(Ordering::Relaxed),
            broken: self.broken.load(Ordering::Relaxed),
            sub_requests: self.sub_requests.load(Ordering::Relaxed),
            controller_errors: self.controller_errors.load(Ordering::Relaxed),
            fragments_sent: self.fragments_sent.load(Ordering::Relaxed),
            fragment_failures: self.fragment_failures.load(Ordering::Relaxed),
            side_channel_requests: self.side_channel_requests.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of bridge metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub calls: u64,
    pub finished: u64,
    pub disconnected: u64,
    pub broken: u64,
    pub sub_requests: u64,
    pub controller_errors: u64,
    pub fragments_sent: u64,
    pub fragment_failures: u64,
    pub side_channel_requests: u64,
    pub connects: u64,
}
