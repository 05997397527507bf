//! Bridge context shared by the lock-step path and the side-channel

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{BridgeBlueprint, Simulation};
use tracing::info;

use crate::metrics::BridgeMetrics;
use crate::registry::{Endpoint, EndpointRegistry};

/// Everything both execution contexts need
///
/// The registry is the only mutable state; every mutation goes through its
/// mutex and every change is reported to the simulation after the lock is
/// released.
pub struct BridgeContext {
    registry: Mutex<EndpointRegistry>,
    simulation: Arc<dyn Simulation>,
    blueprint: BridgeBlueprint,
    metrics: BridgeMetrics,
}

impl BridgeContext {
    pub fn new(blueprint: BridgeBlueprint, simulation: Arc<dyn Simulation>) -> Self {
        let capacity = blueprint.simulation.num_cars.min(simulation.num_cars());
        Self {
            registry: Mutex::new(EndpointRegistry::new(capacity)),
            simulation,
            blueprint,
            metrics: BridgeMetrics::new(),
        }
    }

    /// Lock the registry
    ///
    /// Every registry method leaves it consistent, so a poisoned lock is
    /// still safe to use.
    pub fn registry(&self) -> MutexGuard<'_, EndpointRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn simulation(&self) -> &dyn Simulation {
        self.simulation.as_ref()
    }

    pub fn blueprint(&self) -> &BridgeBlueprint {
        &self.blueprint
    }

    pub fn metrics(&self) -> &BridgeMetrics {
        &self.metrics
    }

    /// Register a controller and notify the simulation
    pub fn register(&self, addr: SocketAddr) -> Option<usize> {
        let (slot, connected) = {
            let mut registry = self.registry();
            let slot = registry.register(addr)?;
            (slot, registry.connected())
        };

        info!(car = slot, endpoint = %addr, "Controller connected");
        self.metrics.inc_connects();
        self.connected_changed(&connected);
        Some(slot)
    }

    /// Remove the endpoint in `slot`, stop its car and notify the simulation
    pub fn release(&self, slot: usize) -> Option<Endpoint> {
        let (endpoint, connected) = {
            let mut registry = self.registry();
            let endpoint = registry.remove(slot)?;
            (endpoint, registry.connected())
        };

        self.stop_car(slot);
        self.connected_changed(&connected);
        Some(endpoint)
    }

    /// Same as [`release`](Self::release), looked up by address
    pub fn release_address(&self, addr: SocketAddr) -> Option<usize> {
        let slot = self.registry().slot_of(addr)?;
        self.release(slot).map(|_| slot)
    }

    /// Drop every endpoint
    pub fn clear(&self) {
        self.registry().clear();
        self.connected_changed(&[]);
    }

    fn stop_car(&self, slot: usize) {
        if let Some(car) = self.simulation.car(slot) {
            car.drive().stop();
        }
    }

    fn connected_changed(&self, connected: &[bool]) {
        observability::record_connected_endpoints(connected.iter().filter(|c| **c).count());
        self.simulation.on_connected_programs_changed(connected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_sim::{MockConfig, MockSimulation, SimCall, SimEvent};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn context(cars: usize) -> (Arc<MockSimulation>, BridgeContext) {
        let sim = Arc::new(MockSimulation::new(MockConfig {
            num_cars: cars,
            ..Default::default()
        }));
        let mut blueprint = BridgeBlueprint::default();
        blueprint.simulation.num_cars = cars;
        let context = BridgeContext::new(blueprint, sim.clone());
        (sim, context)
    }

    #[test]
    fn test_capacity_bounded_by_simulation() {
        let sim = Arc::new(MockSimulation::new(MockConfig {
            num_cars: 1,
            ..Default::default()
        }));
        let mut blueprint = BridgeBlueprint::default();
        blueprint.simulation.num_cars = 4;
        let context = BridgeContext::new(blueprint, sim);
        assert_eq!(context.registry().capacity(), 1);
    }

    #[test]
    fn test_register_notifies_simulation() {
        let (sim, context) = context(2);
        assert_eq!(context.register(addr(6000)), Some(0));
        assert_eq!(
            sim.events(),
            vec![SimEvent::ConnectedProgramsChanged(vec![true])]
        );
        assert_eq!(context.metrics().snapshot().connects, 1);
    }

    #[test]
    fn test_release_stops_car() {
        let (sim, context) = context(2);
        context.register(addr(6000));
        context.register(addr(6001));

        assert_eq!(context.release_address(addr(6000)), Some(0));
        assert_eq!(sim.calls(), vec![SimCall::Stop { car: 0 }]);
        assert_eq!(
            sim.events().last(),
            Some(&SimEvent::ConnectedProgramsChanged(vec![false, true]))
        );
        assert_eq!(context.release_address(addr(6000)), None);
    }
}
