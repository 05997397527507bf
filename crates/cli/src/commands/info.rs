//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BridgeBlueprint, COLOR_HEIGHT, COLOR_WIDTH, LIDAR_NUM_SAMPLES};

use crate::cli::InfoArgs;
use crate::commands::load_blueprint;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    network: NetworkInfo,
    protocol: ProtocolInfo,
    simulation: SimulationInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    endpoints: Vec<EndpointInfo>,
}

#[derive(Serialize)]
struct NetworkInfo {
    sync_addr: String,
    async_addr: String,
    lockstep_timeout_ms: u64,
    async_fragment_ack_ms: u64,
}

#[derive(Serialize)]
struct ProtocolInfo {
    version: u8,
    max_datagram_size: usize,
    color_image_bytes: usize,
    color_fragments: usize,
    color_fragment_bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth_fragments: Option<usize>,
    lidar_samples: usize,
}

#[derive(Serialize)]
struct SimulationInfo {
    num_cars: usize,
    tick_rate_hz: f64,
}

#[derive(Serialize)]
struct EndpointInfo {
    car: usize,
    addr: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!("Loading configuration info");

    let blueprint = load_blueprint(args.config.as_deref())?;

    if args.json {
        let info = build_config_info(&blueprint);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else if args.toml {
        let toml = config_loader::ConfigLoader::to_toml(&blueprint)
            .context("Failed to serialize configuration")?;
        println!("{}", toml);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn color_image_bytes() -> usize {
    COLOR_WIDTH as usize * COLOR_HEIGHT as usize * 4
}

fn build_config_info(blueprint: &BridgeBlueprint) -> ConfigInfo {
    let protocol = &blueprint.protocol;
    let host = blueprint.network.host;

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        network: NetworkInfo {
            sync_addr: blueprint.network.sync_addr().to_string(),
            async_addr: blueprint.network.async_addr().to_string(),
            lockstep_timeout_ms: blueprint.timeouts.lockstep_ms,
            async_fragment_ack_ms: blueprint.timeouts.async_fragment_ack_ms,
        },
        protocol: ProtocolInfo {
            version: protocol.version,
            max_datagram_size: protocol.max_datagram_size,
            color_image_bytes: color_image_bytes(),
            color_fragments: protocol.color_fragments,
            color_fragment_bytes: color_image_bytes() / protocol.color_fragments.max(1),
            depth_fragments: protocol.depth_fragments,
            lidar_samples: LIDAR_NUM_SAMPLES,
        },
        simulation: SimulationInfo {
            num_cars: blueprint.simulation.num_cars,
            tick_rate_hz: blueprint.simulation.tick_rate_hz,
        },
        endpoints: blueprint
            .endpoints
            .iter()
            .enumerate()
            .map(|(car, e)| EndpointInfo {
                car,
                addr: e.addr(host).to_string(),
            })
            .collect(),
    }
}

fn print_config_info(blueprint: &BridgeBlueprint) {
    let info = build_config_info(blueprint);

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Racecar Bridge Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("🌐 Network");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Sync port: {}", info.network.sync_addr);
    println!("   ├─ Async port: {}", info.network.async_addr);
    println!("   ├─ Lock-step timeout: {} ms", info.network.lockstep_timeout_ms);
    println!(
        "   └─ Async fragment ack: {} ms",
        info.network.async_fragment_ack_ms
    );

    println!("\n📦 Protocol");
    println!("   ├─ Version: {}", info.protocol.version);
    println!("   ├─ Max datagram: {} bytes", info.protocol.max_datagram_size);
    println!(
        "   ├─ Color image: {} bytes in {} fragments of {}",
        info.protocol.color_image_bytes,
        info.protocol.color_fragments,
        info.protocol.color_fragment_bytes
    );
    match info.protocol.depth_fragments {
        Some(n) => println!("   ├─ Depth image: {} fragments", n),
        None => println!("   ├─ Depth image: single datagram"),
    }
    println!("   └─ LIDAR samples: {}", info.protocol.lidar_samples);

    println!("\n🚗 Simulation");
    println!("   ├─ Cars: {}", info.simulation.num_cars);
    println!("   └─ Tick rate: {} Hz", info.simulation.tick_rate_hz);

    if !info.endpoints.is_empty() {
        println!("\n🎮 Endpoints ({})", info.endpoints.len());
        for (i, endpoint) in info.endpoints.iter().enumerate() {
            let prefix = if i == info.endpoints.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!("   {} car {}: {}", prefix, endpoint.car, endpoint.addr);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use contracts::EndpointConfig;

    use super::*;

    #[test]
    fn test_default_info() {
        let info = build_config_info(&BridgeBlueprint::default());
        assert_eq!(info.network.sync_addr, "127.0.0.1:5065");
        assert_eq!(info.protocol.color_fragment_bytes, 19_200);
        assert_eq!(info.protocol.lidar_samples, 720);
        assert!(info.endpoints.is_empty());
    }

    #[test]
    fn test_endpoints_listed_in_car_order() {
        let mut blueprint = BridgeBlueprint::default();
        blueprint.simulation.num_cars = 2;
        blueprint.endpoints = vec![
            EndpointConfig {
                host: None,
                port: 6001,
            },
            EndpointConfig {
                host: Some("10.0.0.2".parse().unwrap()),
                port: 6002,
            },
        ];

        let info = build_config_info(&blueprint);
        assert_eq!(info.endpoints[0].addr, "127.0.0.1:6001");
        assert_eq!(info.endpoints[1].car, 1);
        assert_eq!(info.endpoints[1].addr, "10.0.0.2:6002");
    }
}
