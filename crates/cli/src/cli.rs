//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

/// Racecar Bridge - UDP bridge between a racecar simulator and controller programs
#[derive(Parser, Debug)]
#[command(
    name = "racecar-bridge",
    author,
    version,
    about = "Simulator to controller RPC bridge",
    long_about = "Runs the simulator side of the racecar controller bridge.\n\n\
                  Binds the lock-step and async UDP ports, accepts controller \n\
                  programs, and drives a headless simulation through start and \n\
                  update calls until interrupted."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RACECAR_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RACECAR_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge against a headless simulation
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "RACECAR_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override bind host
    #[arg(long, env = "RACECAR_BRIDGE_HOST")]
    pub host: Option<IpAddr>,

    /// Override lock-step port
    #[arg(long, env = "RACECAR_BRIDGE_SYNC_PORT")]
    pub sync_port: Option<u16>,

    /// Override async side-channel port
    #[arg(long, env = "RACECAR_BRIDGE_ASYNC_PORT")]
    pub async_port: Option<u16>,

    /// Override the lock-step reply timeout (milliseconds)
    #[arg(long, env = "RACECAR_BRIDGE_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Override the number of simulated cars
    #[arg(long, env = "RACECAR_BRIDGE_CARS")]
    pub cars: Option<usize>,

    /// Override the tick rate (Hz)
    #[arg(long, env = "RACECAR_BRIDGE_TICK_RATE")]
    pub tick_rate: Option<f64>,

    /// Stop after this many lock-step ticks (0 = unlimited)
    #[arg(long, default_value = "0", env = "RACECAR_BRIDGE_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "RACECAR_BRIDGE_RUN_TIMEOUT")]
    pub run_timeout: u64,

    /// Do not serve the async side-channel
    #[arg(long)]
    pub no_side_channel: bool,

    /// Validate configuration and exit without binding
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RACECAR_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration as TOML
    #[arg(long, conflicts_with = "json")]
    pub toml: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
