//! Config validation
//!
//! Rules:
//! - field ranges (ports, fragment counts, timeouts, car count) via `validator`
//! - sync and async ports differ
//! - pre-assigned endpoints fit in the car count and are unique
//! - pre-assigned endpoints never point at the bridge's own ports
//! - fragment counts leave a non-empty fragment within the datagram limit

use std::collections::HashSet;

use contracts::{BridgeBlueprint, ContractError, COLOR_HEIGHT, COLOR_WIDTH};
use validator::Validate;

/// Bytes per color pixel
const COLOR_BYTES_PER_PIXEL: usize = 4;

/// Validate a BridgeBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    blueprint.validate()?;
    validate_ports(blueprint)?;
    validate_endpoints(blueprint)?;
    validate_color_fragments(blueprint)?;
    Ok(())
}

fn validate_ports(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let network = &blueprint.network;
    if network.sync_port == network.async_port {
        return Err(ContractError::config_validation(
            "network.sync_port / network.async_port",
            format!(
                "sync and async ports must differ, both are {}",
                network.sync_port
            ),
        ));
    }
    Ok(())
}

fn validate_endpoints(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let num_cars = blueprint.simulation.num_cars;
    if blueprint.endpoints.len() > num_cars {
        return Err(ContractError::config_validation(
            "endpoints",
            format!(
                "{} endpoints pre-assigned but the simulation only has {} cars",
                blueprint.endpoints.len(),
                num_cars
            ),
        ));
    }

    let host = blueprint.network.host;
    let own = [blueprint.network.sync_addr(), blueprint.network.async_addr()];
    let mut seen = HashSet::new();
    for (idx, endpoint) in blueprint.endpoints.iter().enumerate() {
        let addr = endpoint.addr(host);
        if own.contains(&addr) {
            return Err(ContractError::config_validation(
                format!("endpoints[{}].port", idx),
                format!("{} is one of the bridge's own sockets", addr),
            ));
        }
        if !seen.insert(addr) {
            return Err(ContractError::config_validation(
                format!("endpoints[{}]", idx),
                format!("duplicate endpoint {}", addr),
            ));
        }
    }
    Ok(())
}

fn validate_color_fragments(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let protocol = &blueprint.protocol;
    let image_len = COLOR_WIDTH as usize * COLOR_HEIGHT as usize * COLOR_BYTES_PER_PIXEL;
    if image_len % protocol.color_fragments != 0 {
        return Err(ContractError::config_validation(
            "protocol.color_fragments",
            format!(
                "{} does not evenly divide the {} byte color image",
                protocol.color_fragments, image_len
            ),
        ));
    }
    let fragment_len = image_len / protocol.color_fragments;
    if fragment_len > protocol.max_datagram_size {
        return Err(ContractError::config_validation(
            "protocol.color_fragments",
            format!(
                "fragments of {} bytes exceed max_datagram_size {}",
                fragment_len, protocol.max_datagram_size
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EndpointConfig;

    #[test]
    fn test_default_blueprint_is_valid() {
        assert!(validate(&BridgeBlueprint::default()).is_ok());
    }

    #[test]
    fn test_same_ports_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.network.async_port = bp.network.sync_port;
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_too_many_endpoints_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.simulation.num_cars = 1;
        bp.endpoints = vec![
            EndpointConfig {
                host: None,
                port: 6000,
            },
            EndpointConfig {
                host: None,
                port: 6001,
            },
        ];
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("only has 1 cars"));
    }

    #[test]
    fn test_duplicate_endpoint_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.simulation.num_cars = 2;
        bp.endpoints = vec![
            EndpointConfig {
                host: None,
                port: 6000,
            },
            EndpointConfig {
                host: None,
                port: 6000,
            },
        ];
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_endpoint_on_bridge_port_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.endpoints = vec![EndpointConfig {
            host: None,
            port: bp.network.sync_port,
        }];
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_indivisible_color_fragments_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.protocol.color_fragments = 7;
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("evenly divide"));
    }

    #[test]
    fn test_oversized_fragments_rejected() {
        let mut bp = BridgeBlueprint::default();
        bp.protocol.color_fragments = 4;
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("exceed"));
    }
}
