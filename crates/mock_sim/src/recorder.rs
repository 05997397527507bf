//! Call and event log

use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{Button, CallOutcome, ErrorCode, Joystick, Trigger};

/// One collaborator operation performed by the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    DeltaTime,
    ColorImage { car: usize },
    DepthImage { car: usize },
    CameraWidth { car: usize },
    CameraHeight { car: usize },
    IsDown(Button),
    WasPressed(Button),
    WasReleased(Button),
    Trigger(Trigger),
    Joystick(Joystick),
    SetSpeedAngle { car: usize, speed: f32, angle: f32 },
    Stop { car: usize },
    SetMaxSpeed { car: usize, max_speed: f32 },
    LidarNumSamples { car: usize },
    LidarSamples { car: usize },
    LinearAcceleration { car: usize },
    AngularVelocity { car: usize },
}

/// Notification raised by the bridge
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    ControllerError {
        car: usize,
        code: Option<ErrorCode>,
    },
    SessionBroken {
        car: usize,
        outcome: CallOutcome,
    },
    ConnectedProgramsChanged(Vec<bool>),
}

/// Shared append-only log
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<SimCall>>,
    events: Mutex<Vec<SimEvent>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Recorder {
    pub fn call(&self, call: SimCall) {
        lock(&self.calls).push(call);
    }

    pub fn event(&self, event: SimEvent) {
        lock(&self.events).push(event);
    }

    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.calls).clone()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        lock(&self.events).clone()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
        lock(&self.events).clear();
    }
}
