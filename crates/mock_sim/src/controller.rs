//! Scriptable game controller

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::{Button, ControllerInput, Joystick, Trigger, Vector2};

use crate::recorder::SimCall;
use crate::Recorder;

#[derive(Debug, Default)]
struct ControllerState {
    down: HashSet<Button>,
    pressed: HashSet<Button>,
    released: HashSet<Button>,
    left_trigger: f32,
    right_trigger: f32,
    left_joystick: Vector2,
    right_joystick: Vector2,
}

/// Controller whose state tests and the headless driver set directly
#[derive(Debug)]
pub struct MockController {
    state: Mutex<ControllerState>,
    recorder: std::sync::Arc<Recorder>,
}

impl MockController {
    pub(crate) fn new(recorder: std::sync::Arc<Recorder>) -> Self {
        Self {
            state: Mutex::new(ControllerState::default()),
            recorder,
        }
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold or release a button; edges are reported until the next tick
    pub fn set_down(&self, button: Button, down: bool) {
        let mut state = self.state();
        let was_down = state.down.contains(&button);
        match (was_down, down) {
            (false, true) => {
                state.down.insert(button);
                state.pressed.insert(button);
            }
            (true, false) => {
                state.down.remove(&button);
                state.released.insert(button);
            }
            _ => {}
        }
    }

    pub fn set_trigger(&self, trigger: Trigger, value: f32) {
        let value = value.clamp(0.0, 1.0);
        let mut state = self.state();
        match trigger {
            Trigger::Left => state.left_trigger = value,
            Trigger::Right => state.right_trigger = value,
        }
    }

    pub fn set_joystick(&self, joystick: Joystick, value: Vector2) {
        let value = Vector2 {
            x: value.x.clamp(-1.0, 1.0),
            y: value.y.clamp(-1.0, 1.0),
        };
        let mut state = self.state();
        match joystick {
            Joystick::Left => state.left_joystick = value,
            Joystick::Right => state.right_joystick = value,
        }
    }

    /// Forget pressed/released edges
    pub(crate) fn end_tick(&self) {
        let mut state = self.state();
        state.pressed.clear();
        state.released.clear();
    }
}

impl ControllerInput for MockController {
    fn is_down(&self, button: Button) -> bool {
        self.recorder.call(SimCall::IsDown(button));
        self.state().down.contains(&button)
    }

    fn was_pressed(&self, button: Button) -> bool {
        self.recorder.call(SimCall::WasPressed(button));
        self.state().pressed.contains(&button)
    }

    fn was_released(&self, button: Button) -> bool {
        self.recorder.call(SimCall::WasReleased(button));
        self.state().released.contains(&button)
    }

    fn trigger(&self, trigger: Trigger) -> f32 {
        self.recorder.call(SimCall::Trigger(trigger));
        let state = self.state();
        match trigger {
            Trigger::Left => state.left_trigger,
            Trigger::Right => state.right_trigger,
        }
    }

    fn joystick(&self, joystick: Joystick) -> Vector2 {
        self.recorder.call(SimCall::Joystick(joystick));
        let state = self.state();
        match joystick {
            Joystick::Left => state.left_joystick,
            Joystick::Right => state.right_joystick,
        }
    }
}
