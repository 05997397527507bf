//! Driver run statistics.

use std::time::Duration;

use bridge::{CallReport, MetricsSnapshot};
use observability::BridgeStatsAggregator;

/// Statistics from a driver run
#[derive(Debug, Clone, Default)]
pub struct DriverStats {
    /// Ticks that issued a top-level call
    pub ticks: u64,

    /// Ticks skipped because no program was connected
    pub idle_ticks: u64,

    /// Collaborator operations performed on the simulation
    pub collaborator_calls: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-session aggregates
    pub aggregator: BridgeStatsAggregator,

    /// Bridge counters at exit
    pub bridge: MetricsSnapshot,
}

impl DriverStats {
    /// Fold one top-level call into the statistics
    pub fn record(&mut self, report: &CallReport, collaborator_calls: u64) {
        self.ticks += 1;
        self.collaborator_calls += collaborator_calls;
        self.aggregator.record_call();
        for session in &report.sessions {
            self.aggregator.record_session(
                session.outcome,
                session.elapsed,
                session.sub_requests,
                session.controller_errors,
            );
        }
    }

    /// Lock-step ticks per second
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Bridge Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lock-step ticks: {}", self.ticks);
        println!("   ├─ Idle ticks: {}", self.idle_ticks);
        println!("   ├─ Tick rate: {:.2}/s", self.tick_rate());
        println!("   └─ Collaborator calls: {}", self.collaborator_calls);

        let bridge = &self.bridge;
        println!("\n🔌 Bridge Counters");
        println!("   ├─ Connects: {}", bridge.connects);
        println!("   ├─ Finished turns: {}", bridge.finished);
        println!("   ├─ Disconnected: {}", bridge.disconnected);
        println!("   ├─ Broken sessions: {}", bridge.broken);
        println!(
            "   ├─ Fragments sent: {} ({} failed transfers)",
            bridge.fragments_sent, bridge.fragment_failures
        );
        println!("   └─ Side-channel requests: {}", bridge.side_channel_requests);

        println!("\n{}", self.aggregator.summary());
    }
}
