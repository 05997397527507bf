//! Bridge metrics
//!
//! Thin wrappers over the `metrics` facade plus an in-memory aggregator used
//! for end-of-run summaries.

use std::collections::HashMap;
use std::time::Duration;

use contracts::{CallOutcome, Opcode, TopLevelCall};
use metrics::{counter, gauge, histogram};

/// Record the outcome of servicing one endpoint during a top-level call
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_call_outcome;
///
/// let report = bridge.handle_update().await;
/// for session in &report.sessions {
///     record_call_outcome(report.call, session.outcome, session.elapsed);
/// }
/// ```
pub fn record_call_outcome(call: TopLevelCall, outcome: CallOutcome, elapsed: Duration) {
    counter!(
        "racecar_bridge_calls_total",
        "call" => call.name(),
        "outcome" => outcome.label()
    )
    .increment(1);

    histogram!("racecar_bridge_call_latency_ms", "call" => call.name())
        .record(elapsed.as_secs_f64() * 1000.0);

    if outcome.is_failure() {
        counter!("racecar_bridge_sessions_broken_total", "outcome" => outcome.label())
            .increment(1);
    }
}

/// Record one serviced sub-request
pub fn record_sub_request(opcode: Opcode) {
    counter!("racecar_bridge_sub_requests_total", "opcode" => opcode.name()).increment(1);
}

/// Record a finished (or aborted) fragmented transfer
pub fn record_fragment_transfer(success: bool, fragments_sent: usize) {
    let status = if success { "success" } else { "failure" };
    counter!("racecar_bridge_fragment_transfers_total", "status" => status).increment(1);
    histogram!("racecar_bridge_fragments_per_transfer").record(fragments_sent as f64);
}

/// Record the number of live endpoints
pub fn record_connected_endpoints(count: usize) {
    gauge!("racecar_bridge_connected_endpoints").set(count as f64);
}

/// Record a controller-reported error
pub fn record_controller_error(car: usize) {
    counter!(
        "racecar_bridge_controller_errors_total",
        "car" => car.to_string()
    )
    .increment(1);
}

/// Record a side-channel request (`None` for unknown tags)
pub fn record_side_channel_request(opcode: Option<Opcode>) {
    let name = opcode.map(Opcode::name).unwrap_or("unknown");
    counter!("racecar_bridge_side_channel_requests_total", "opcode" => name).increment(1);
}

/// Bridge statistics aggregator
///
/// Aggregates per-session results in memory for run summaries.
#[derive(Debug, Clone, Default)]
pub struct BridgeStatsAggregator {
    /// Top-level calls issued (one per tick, not per endpoint)
    pub total_calls: u64,

    /// Endpoint turns serviced
    pub total_sessions: u64,

    /// Sub-requests serviced across all turns
    pub total_sub_requests: u64,

    /// Controller-reported errors
    pub controller_errors: u64,

    /// Turn count per outcome
    pub outcome_counts: HashMap<CallOutcome, u64>,

    /// Per-turn latency (ms)
    pub latency_stats: RunningStats,

    /// Sub-requests per turn
    pub sub_request_stats: RunningStats,
}

impl BridgeStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one top-level call
    pub fn record_call(&mut self) {
        self.total_calls += 1;
    }

    /// Fold one endpoint turn into the statistics
    pub fn record_session(
        &mut self,
        outcome: CallOutcome,
        elapsed: Duration,
        sub_requests: u64,
        controller_errors: u64,
    ) {
        self.total_sessions += 1;
        self.total_sub_requests += sub_requests;
        self.controller_errors += controller_errors;
        *self.outcome_counts.entry(outcome).or_insert(0) += 1;
        self.latency_stats.push(elapsed.as_secs_f64() * 1000.0);
        self.sub_request_stats.push(sub_requests as f64);
    }

    /// Number of turns that broke their session
    pub fn failures(&self) -> u64 {
        self.outcome_counts
            .iter()
            .filter(|(outcome, _)| outcome.is_failure())
            .map(|(_, count)| count)
            .sum()
    }

    /// Generate a summary report
    pub fn summary(&self) -> StatsSummaryReport {
        let mut outcomes: Vec<_> = self
            .outcome_counts
            .iter()
            .map(|(outcome, count)| (outcome.label(), *count))
            .collect();
        outcomes.sort();

        StatsSummaryReport {
            total_calls: self.total_calls,
            total_sessions: self.total_sessions,
            total_sub_requests: self.total_sub_requests,
            controller_errors: self.controller_errors,
            failures: self.failures(),
            outcomes,
            latency_ms: StatsSummary::from(&self.latency_stats),
            sub_requests_per_turn: StatsSummary::from(&self.sub_request_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Summary of a bridge run
#[derive(Debug, Clone, Default)]
pub struct StatsSummaryReport {
    pub total_calls: u64,
    pub total_sessions: u64,
    pub total_sub_requests: u64,
    pub controller_errors: u64,
    pub failures: u64,
    pub outcomes: Vec<(&'static str, u64)>,
    pub latency_ms: StatsSummary,
    pub sub_requests_per_turn: StatsSummary,
}

impl std::fmt::Display for StatsSummaryReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bridge Summary ===")?;
        writeln!(f, "Top-level calls: {}", self.total_calls)?;
        writeln!(f, "Endpoint turns: {}", self.total_sessions)?;
        writeln!(f, "Sub-requests: {}", self.total_sub_requests)?;
        writeln!(f, "Controller errors: {}", self.controller_errors)?;
        writeln!(f, "Broken sessions: {}", self.failures)?;
        writeln!(f, "Turn latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Sub-requests per turn: {}", self.sub_requests_per_turn)?;

        if !self.outcomes.is_empty() {
            writeln!(f, "Outcomes:")?;
            for (outcome, count) in &self.outcomes {
                writeln!(f, "  {}: {}", outcome, count)?;
            }
        }

        Ok(())
    }
}

/// Stats summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_failures() {
        let mut aggregator = BridgeStatsAggregator::new();
        aggregator.record_call();
        aggregator.record_session(CallOutcome::Finished, Duration::from_millis(2), 3, 0);
        aggregator.record_session(CallOutcome::TimedOut, Duration::from_millis(100), 0, 0);
        aggregator.record_session(CallOutcome::Disconnected, Duration::from_millis(1), 1, 1);

        assert_eq!(aggregator.total_calls, 1);
        assert_eq!(aggregator.total_sessions, 3);
        assert_eq!(aggregator.total_sub_requests, 4);
        assert_eq!(aggregator.controller_errors, 1);
        assert_eq!(aggregator.failures(), 1);
        assert_eq!(
            aggregator.outcome_counts.get(&CallOutcome::Finished),
            Some(&1)
        );
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = BridgeStatsAggregator::new();
        aggregator.record_call();
        aggregator.record_session(CallOutcome::Finished, Duration::from_millis(4), 2, 0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Top-level calls: 1"));
        assert!(output.contains("finished: 1"));
        assert!(output.contains("Broken sessions: 0"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_call_outcome(
            TopLevelCall::Update,
            CallOutcome::Desync,
            Duration::from_millis(1),
        );
        record_sub_request(Opcode::DriveStop);
        record_fragment_transfer(false, 15);
        record_connected_endpoints(2);
        record_controller_error(0);
        record_side_channel_request(None);
    }
}
