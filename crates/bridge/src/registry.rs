//! Endpoint registry
//!
//! Slot `i` holds the controller driving car `i`. Departed endpoints leave an
//! empty slot so the remaining controllers keep their cars.

use std::net::SocketAddr;

use contracts::SessionState;

/// One connected controller process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: SocketAddr,
    pub state: SessionState,
}

impl Endpoint {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            state: SessionState::Connected,
        }
    }
}

/// Live endpoints indexed by car slot
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    slots: Vec<Option<Endpoint>>,
    capacity: usize,
}

impl EndpointRegistry {
    /// Registry for at most `capacity` cars
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register an endpoint, returning its slot
    ///
    /// Fills the first empty slot, otherwise appends. `None` once every car
    /// already has an endpoint. The same address may be registered twice.
    pub fn register(&mut self, addr: SocketAddr) -> Option<usize> {
        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.slots[slot] = Some(Endpoint::new(addr));
            return Some(slot);
        }

        if self.slots.len() >= self.capacity {
            return None;
        }

        self.slots.push(Some(Endpoint::new(addr)));
        Some(self.slots.len() - 1)
    }

    /// Vacate a slot, returning the endpoint that held it
    pub fn remove(&mut self, slot: usize) -> Option<Endpoint> {
        let removed = self.slots.get_mut(slot).and_then(Option::take);
        self.trim();
        removed
    }

    /// Vacate the first slot held by `addr`
    pub fn remove_address(&mut self, addr: SocketAddr) -> Option<(usize, Endpoint)> {
        let slot = self.slot_of(addr)?;
        self.remove(slot).map(|endpoint| (slot, endpoint))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of live endpoints
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// One flag per slot, for display
    pub fn connected(&self) -> Vec<bool> {
        self.slots.iter().map(Option::is_some).collect()
    }

    pub fn get(&self, slot: usize) -> Option<&Endpoint> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn slot_of(&self, addr: SocketAddr) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.is_some_and(|e| e.addr == addr))
    }

    /// Live endpoints in slot order
    pub fn endpoints(&self) -> Vec<(usize, Endpoint)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| e.map(|e| (slot, e)))
            .collect()
    }

    pub fn session_state(&self, slot: usize) -> Option<SessionState> {
        self.get(slot).map(|e| e.state)
    }

    /// Returns false when the slot is empty
    pub fn set_state(&mut self, slot: usize, state: SessionState) -> bool {
        match self.slots.get_mut(slot).and_then(Option::as_mut) {
            Some(endpoint) => {
                endpoint.state = state;
                true
            }
            None => false,
        }
    }

    fn trim(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
    }
}
