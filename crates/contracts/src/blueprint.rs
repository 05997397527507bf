//! BridgeBlueprint - Config Loader output
//!
//! Describes how the bridge binds, how long it waits, how it fragments large
//! payloads, how many cars the simulation offers, and which controllers are
//! pre-assigned to the lock-step path.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    COLOR_IMAGE_FRAGMENTS, DEFAULT_ASYNC_PORT, DEFAULT_SYNC_PORT, MAX_DATAGRAM_SIZE,
    PROTOCOL_VERSION,
};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BridgeBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    #[validate(nested)]
    pub network: NetworkConfig,

    #[serde(default)]
    #[validate(nested)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    #[validate(nested)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    #[validate(nested)]
    pub simulation: SimulationConfig,

    /// Controllers pre-assigned to the sync path, in car order
    #[serde(default)]
    #[validate(nested)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Socket addresses
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NetworkConfig {
    /// Loopback by default
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port for lock-step calls
    #[serde(default = "default_sync_port")]
    #[validate(range(min = 1))]
    pub sync_port: u16,

    /// Port for the async side-channel
    #[serde(default = "default_async_port")]
    #[validate(range(min = 1))]
    pub async_port: u16,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_sync_port() -> u16 {
    DEFAULT_SYNC_PORT
}

fn default_async_port() -> u16 {
    DEFAULT_ASYNC_PORT
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            sync_port: default_sync_port(),
            async_port: default_async_port(),
        }
    }
}

impl NetworkConfig {
    pub fn sync_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.sync_port)
    }

    pub fn async_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.async_port)
    }
}

/// Wire-level parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProtocolConfig {
    /// Version a controller must present when connecting
    #[serde(default = "default_protocol_version")]
    pub version: u8,

    /// Largest datagram the bridge will send
    #[serde(default = "default_max_datagram_size")]
    #[validate(range(min = 1, max = 65507))]
    pub max_datagram_size: usize,

    /// Fragment count for color images
    #[serde(default = "default_color_fragments")]
    #[validate(range(min = 1))]
    pub color_fragments: usize,

    /// Fragment count for depth images (`None` = single datagram)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub depth_fragments: Option<usize>,
}

fn default_protocol_version() -> u8 {
    PROTOCOL_VERSION
}

fn default_max_datagram_size() -> usize {
    MAX_DATAGRAM_SIZE
}

fn default_color_fragments() -> usize {
    COLOR_IMAGE_FRAGMENTS
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            version: default_protocol_version(),
            max_datagram_size: default_max_datagram_size(),
            color_fragments: default_color_fragments(),
            depth_fragments: None,
        }
    }
}

/// Bounded waits
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TimeoutConfig {
    /// Wait for each reply during a lock-step call
    #[serde(default = "default_lockstep_ms")]
    #[validate(range(min = 1))]
    pub lockstep_ms: u64,

    /// Wait for each fragment acknowledgement on the side-channel
    #[serde(default = "default_async_fragment_ack_ms")]
    #[validate(range(min = 1))]
    pub async_fragment_ack_ms: u64,
}

fn default_lockstep_ms() -> u64 {
    5000
}

fn default_async_fragment_ack_ms() -> u64 {
    10_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            lockstep_ms: default_lockstep_ms(),
            async_fragment_ack_ms: default_async_fragment_ack_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn lockstep(&self) -> Duration {
        Duration::from_millis(self.lockstep_ms)
    }

    pub fn async_fragment_ack(&self) -> Duration {
        Duration::from_millis(self.async_fragment_ack_ms)
    }
}

/// Simulation shape as seen by the bridge
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SimulationConfig {
    /// Number of cars, which bounds the number of endpoints
    #[serde(default = "default_num_cars")]
    #[validate(range(min = 1, max = 255))]
    pub num_cars: usize,

    /// Lock-step cadence of the headless driver
    #[serde(default = "default_tick_rate_hz")]
    #[validate(range(min = 1.0, max = 1000.0))]
    pub tick_rate_hz: f64,
}

fn default_num_cars() -> usize {
    1
}

fn default_tick_rate_hz() -> f64 {
    60.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_cars: default_num_cars(),
            tick_rate_hz: default_tick_rate_hz(),
        }
    }
}

/// Pre-assigned controller
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EndpointConfig {
    /// Defaults to `network.host`
    #[serde(default)]
    pub host: Option<IpAddr>,

    #[validate(range(min = 1))]
    pub port: u16,
}

impl EndpointConfig {
    pub fn addr(&self, default_host: IpAddr) -> SocketAddr {
        SocketAddr::new(self.host.unwrap_or(default_host), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol_constants() {
        let bp = BridgeBlueprint::default();
        assert_eq!(bp.network.sync_port, 5065);
        assert_eq!(bp.network.async_port, 5064);
        assert_eq!(bp.protocol.color_fragments, 32);
        assert_eq!(bp.protocol.max_datagram_size, 65507);
        assert_eq!(bp.timeouts.lockstep(), Duration::from_secs(5));
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let bp: BridgeBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(bp.simulation.num_cars, 1);
        assert!(bp.endpoints.is_empty());
        assert!(bp.protocol.depth_fragments.is_none());
    }

    #[test]
    fn test_zero_fragments_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.protocol.color_fragments = 0;
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_endpoint_addr_falls_back_to_network_host() {
        let ep = EndpointConfig {
            host: None,
            port: 5066,
        };
        let addr = ep.addr(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(addr.to_string(), "127.0.0.1:5066");
    }
}
