//! Headless driver - ticks a mock simulation through the bridge.
//!
//! Stands in for the simulator's frame loop: `start` whenever a program
//! joins, `update` every tick afterwards, `exit` on shutdown.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bridge::{Bridge, CallReport};
use contracts::{BridgeBlueprint, CallOutcome};
use mock_sim::{MockConfig, MockSimulation};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::DriverStats;

/// Driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// The bridge configuration
    pub blueprint: BridgeBlueprint,

    /// Maximum number of lock-step ticks (None = unlimited)
    pub max_ticks: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Serve the async side-channel
    pub side_channel: bool,
}

/// Frame loop around a [`Bridge`] and a [`MockSimulation`]
pub struct HeadlessDriver {
    config: DriverConfig,
}

impl HeadlessDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the tick limit, or the timeout
    ///
    /// The bridge always gets its exit call before this returns.
    pub async fn run<F>(self, shutdown: F) -> Result<DriverStats>
    where
        F: Future<Output = ()>,
    {
        let DriverConfig {
            blueprint,
            max_ticks,
            timeout,
            metrics_port,
            side_channel,
        } = self.config;

        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
        }

        let tick_period = Duration::from_secs_f64(1.0 / blueprint.simulation.tick_rate_hz);
        let sim = Arc::new(MockSimulation::new(MockConfig {
            num_cars: blueprint.simulation.num_cars,
            delta_time: tick_period.as_secs_f32(),
            ..Default::default()
        }));

        let mut bridge = Bridge::bind(blueprint, sim.clone())
            .await
            .context("Failed to bind bridge sockets")?;
        if side_channel {
            bridge.spawn_side_channel();
        }

        info!(
            sync = ?bridge.local_sync_addr(),
            async_ = ?bridge.local_async_addr(),
            tick_ms = tick_period.as_secs_f64() * 1000.0,
            "Bridge listening"
        );

        let mut stats = DriverStats::default();
        let started = Instant::now();
        let mut interval = tokio::time::interval(tick_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_tick = Instant::now();
        let mut running = vec![false; sim.config().num_cars];

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping bridge...");
                    break;
                }
                _ = interval.tick() => {}
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    info!(timeout_secs = limit.as_secs_f64(), "Run timeout reached");
                    break;
                }
            }

            let now = Instant::now();
            sim.advance(now.duration_since(last_tick).as_secs_f32());
            last_tick = now;

            let connected = bridge.connected_programs();
            if !connected.iter().any(|c| *c) {
                running.iter_mut().for_each(|r| *r = false);
                stats.idle_ticks += 1;
                sim.clear_log();
                continue;
            }

            let joined = connected
                .iter()
                .zip(&running)
                .any(|(connected, running)| *connected && !*running);

            let report = if joined {
                debug!(?connected, "Program joined, running start");
                bridge.handle_start().await
            } else {
                bridge.handle_update().await
            };

            // A car runs once its program finished a call; anything else
            // means the next join starts it again.
            for (car, flag) in running.iter_mut().enumerate() {
                if let Some(outcome) = report.outcome_for(car) {
                    *flag = outcome == CallOutcome::Finished;
                } else if !connected.get(car).copied().unwrap_or(false) {
                    *flag = false;
                }
            }

            stats.record(&report, sim.calls().len() as u64);
            sim.clear_log();
            log_report(&report);

            if let Some(limit) = max_ticks {
                if stats.ticks >= limit {
                    info!(ticks = stats.ticks, "Tick limit reached");
                    break;
                }
            }
        }

        bridge.handle_exit().await;

        stats.duration = started.elapsed();
        stats.bridge = bridge.metrics();
        Ok(stats)
    }
}

fn log_report(report: &CallReport) {
    if report.aborted {
        warn!(
            call = report.call.name(),
            serviced = report.sessions.len(),
            "Call aborted by a broken session"
        );
    }
}
