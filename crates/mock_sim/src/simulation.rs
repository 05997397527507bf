//! Mock simulation

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    CallOutcome, ControllerInput, DriveState, ErrorCode, Racecar, Simulation,
};
use tracing::{info, warn};

use crate::controller::MockController;
use crate::racecar::MockRacecar;
use crate::recorder::{Recorder, SimCall, SimEvent};
use crate::MockConfig;

/// Headless simulation
///
/// Records every collaborator call and every bridge notification. A car
/// whose session broke stays under manual control until a program is
/// connected to its slot again.
#[derive(Debug)]
pub struct MockSimulation {
    config: MockConfig,
    cars: Vec<MockRacecar>,
    controller: MockController,
    recorder: Arc<Recorder>,
    tick: Arc<AtomicU64>,
    delta_time: AtomicU32,
    controller_enabled: AtomicBool,
    manual_control: Mutex<Vec<bool>>,
}

impl MockSimulation {
    pub fn new(config: MockConfig) -> Self {
        let recorder = Arc::new(Recorder::default());
        let tick = Arc::new(AtomicU64::new(0));
        let cars = (0..config.num_cars)
            .map(|i| MockRacecar::new(i, config.clone(), tick.clone(), recorder.clone()))
            .collect();

        Self {
            delta_time: AtomicU32::new(config.delta_time.to_bits()),
            manual_control: Mutex::new(vec![false; config.num_cars]),
            controller: MockController::new(recorder.clone()),
            controller_enabled: AtomicBool::new(true),
            config,
            cars,
            recorder,
            tick,
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    /// Advance one tick of `dt` seconds
    pub fn advance(&self, dt: f32) {
        self.delta_time.store(dt.to_bits(), Ordering::Relaxed);
        self.tick.fetch_add(1, Ordering::Relaxed);
        self.controller.end_tick();
    }

    pub fn ticks(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn mock_controller(&self) -> &MockController {
        &self.controller
    }

    pub fn set_controller_enabled(&self, enabled: bool) {
        self.controller_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Drive state of `car`, not logged as a call
    pub fn drive_state(&self, car: usize) -> Option<DriveState> {
        self.cars.get(car).map(MockRacecar::drive_state)
    }

    /// True once the car fell back to manual control
    pub fn is_manual(&self, car: usize) -> bool {
        self.manual().get(car).copied().unwrap_or(false)
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.recorder.calls()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.recorder.events()
    }

    pub fn clear_log(&self) {
        self.recorder.clear();
    }

    fn manual(&self) -> MutexGuard<'_, Vec<bool>> {
        self.manual_control
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Simulation for MockSimulation {
    fn num_cars(&self) -> usize {
        self.cars.len()
    }

    fn car(&self, index: usize) -> Option<&dyn Racecar> {
        self.cars.get(index).map(|car| car as &dyn Racecar)
    }

    fn controller(&self) -> &dyn ControllerInput {
        &self.controller
    }

    fn delta_time(&self) -> f32 {
        self.recorder.call(SimCall::DeltaTime);
        f32::from_bits(self.delta_time.load(Ordering::Relaxed))
    }

    fn controller_enabled(&self) -> bool {
        self.controller_enabled.load(Ordering::Relaxed)
    }

    fn on_controller_error(&self, car: usize, code: Option<ErrorCode>) {
        warn!(car, code = ?code, "Program reported an error");
        self.recorder.event(SimEvent::ControllerError { car, code });
    }

    fn on_session_broken(&self, car: usize, outcome: CallOutcome, message: &str) {
        warn!(car, %outcome, reason = message, "Falling back to manual control");
        if let Some(flag) = self.manual().get_mut(car) {
            *flag = true;
        }
        self.recorder.event(SimEvent::SessionBroken { car, outcome });
    }

    fn on_connected_programs_changed(&self, connected: &[bool]) {
        info!(?connected, "Connected programs changed");
        {
            let mut manual = self.manual();
            for (flag, connected) in manual.iter_mut().zip(connected) {
                if *connected {
                    *flag = false;
                }
            }
        }
        self.recorder
            .event(SimEvent::ConnectedProgramsChanged(connected.to_vec()));
    }
}
