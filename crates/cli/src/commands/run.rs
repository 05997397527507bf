//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::BridgeBlueprint;

use crate::cli::RunArgs;
use crate::commands::load_blueprint;
use crate::driver::{DriverConfig, HeadlessDriver};
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;

    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint).map_err(CliError::ConfigValidation)?;

    info!(
        sync = %blueprint.network.sync_addr(),
        async_ = %blueprint.network.async_addr(),
        cars = blueprint.simulation.num_cars,
        endpoints = blueprint.endpoints.len(),
        lockstep_ms = blueprint.timeouts.lockstep_ms,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let driver_config = DriverConfig {
        blueprint,
        max_ticks: if args.max_ticks == 0 {
            None
        } else {
            Some(args.max_ticks)
        },
        timeout: if args.run_timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.run_timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        side_channel: !args.no_side_channel,
    };

    let driver = HeadlessDriver::new(driver_config);

    info!("Starting bridge...");

    let stats = driver
        .run(setup_shutdown_signal())
        .await
        .context("Bridge run failed")?;

    info!(
        ticks = stats.ticks,
        idle_ticks = stats.idle_ticks,
        broken_sessions = stats.aggregator.failures(),
        duration_secs = stats.duration.as_secs_f64(),
        tick_rate = format!("{:.2}", stats.tick_rate()),
        "Bridge stopped"
    );
    stats.print_summary();

    Ok(())
}

fn apply_overrides(blueprint: &mut BridgeBlueprint, args: &RunArgs) {
    if let Some(host) = args.host {
        info!(host = %host, "Overriding bind host from CLI");
        blueprint.network.host = host;
    }
    if let Some(port) = args.sync_port {
        info!(port, "Overriding sync port from CLI");
        blueprint.network.sync_port = port;
    }
    if let Some(port) = args.async_port {
        info!(port, "Overriding async port from CLI");
        blueprint.network.async_port = port;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        info!(timeout_ms, "Overriding lock-step timeout from CLI");
        blueprint.timeouts.lockstep_ms = timeout_ms;
    }
    if let Some(cars) = args.cars {
        info!(cars, "Overriding car count from CLI");
        blueprint.simulation.num_cars = cars;
    }
    if let Some(rate) = args.tick_rate {
        info!(rate, "Overriding tick rate from CLI");
        blueprint.simulation.tick_rate_hz = rate;
    }
}

/// Wait for Ctrl+C or SIGTERM
///
/// A handler that cannot be installed never fires.
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &BridgeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Network:");
    println!("  Sync port: {}", blueprint.network.sync_addr());
    println!("  Async port: {}", blueprint.network.async_addr());
    println!("\nSimulation:");
    println!("  Cars: {}", blueprint.simulation.num_cars);
    println!("  Tick rate: {} Hz", blueprint.simulation.tick_rate_hz);
    println!("\nTimeouts:");
    println!("  Lock-step: {} ms", blueprint.timeouts.lockstep_ms);
    println!(
        "  Async fragment ack: {} ms",
        blueprint.timeouts.async_fragment_ack_ms
    );

    if !blueprint.endpoints.is_empty() {
        println!("\nEndpoints ({}):", blueprint.endpoints.len());
        for (car, endpoint) in blueprint.endpoints.iter().enumerate() {
            println!("  - car {}: {}", car, endpoint.addr(blueprint.network.host));
        }
    }

    println!();
}
