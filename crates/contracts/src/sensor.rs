//! Sensor/actuator capability traits
//!
//! The simulation owns every sensor and actuator; the bridge only marshals
//! the values it reads and forwards the commands it receives. Methods take
//! `&self` because the lock-step path and the side-channel read the same
//! collaborators from different threads, so implementations keep their own
//! interior synchronization. Actuator writes are last-write-wins.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Button, CallOutcome, ErrorCode, Joystick, Trigger};

/// Fixed number of LIDAR samples per sweep
pub const LIDAR_NUM_SAMPLES: usize = 720;

/// Color camera width in pixels
pub const COLOR_WIDTH: i32 = 640;

/// Color camera height in pixels
pub const COLOR_HEIGHT: i32 = 480;

/// 2D vector (joystick axes)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

/// 3D vector (IMU readings)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Front camera
pub trait Camera: Send + Sync {
    /// Raw packed pixel bytes (4 bytes per pixel, row-major)
    fn color_image(&self) -> Bytes;

    /// Row-major `f32` depth values, little-endian bytes
    fn depth_image(&self) -> Bytes;

    fn width(&self) -> i32 {
        COLOR_WIDTH
    }

    fn height(&self) -> i32 {
        COLOR_HEIGHT
    }
}

/// Planar LIDAR
pub trait Lidar: Send + Sync {
    /// One sweep of `LIDAR_NUM_SAMPLES` distances, angle-ordered
    fn samples(&self) -> Vec<f32>;

    fn num_samples(&self) -> i32 {
        LIDAR_NUM_SAMPLES as i32
    }
}

/// Inertial measurement unit
pub trait Physics: Send + Sync {
    /// m/s²
    fn linear_acceleration(&self) -> Vector3;

    /// rad/s
    fn angular_velocity(&self) -> Vector3;
}

/// Last commanded drive state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveState {
    /// Signed speed in [-1, 1]
    pub speed: f32,
    /// Signed steering angle in [-1, 1]
    pub angle: f32,
    /// Scale applied to `speed`
    pub max_speed: f32,
}

/// Drive actuator
pub trait Drive: Send + Sync {
    fn set_speed_angle(&self, speed: f32, angle: f32);

    /// Equivalent to setting speed and angle to zero
    fn stop(&self);

    fn set_max_speed(&self, max_speed: f32);

    fn state(&self) -> DriveState;
}

/// Game controller shared by every car
pub trait ControllerInput: Send + Sync {
    fn is_down(&self, button: Button) -> bool;

    fn was_pressed(&self, button: Button) -> bool;

    fn was_released(&self, button: Button) -> bool;

    /// Value in [0, 1]
    fn trigger(&self, trigger: Trigger) -> f32;

    /// Axes each in [-1, 1]
    fn joystick(&self, joystick: Joystick) -> Vector2;
}

/// Capability bundle of one simulated car
pub trait Racecar: Send + Sync {
    fn camera(&self) -> &dyn Camera;
    fn lidar(&self) -> &dyn Lidar;
    fn physics(&self) -> &dyn Physics;
    fn drive(&self) -> &dyn Drive;
}

/// The simulation as seen by the bridge
///
/// Besides exposing the cars, the simulation receives the notifications the
/// bridge raises so the front-end can show them and fall back to manual
/// control.
pub trait Simulation: Send + Sync {
    fn num_cars(&self) -> usize;

    fn car(&self, index: usize) -> Option<&dyn Racecar>;

    fn controller(&self) -> &dyn ControllerInput;

    /// Seconds since the previous tick
    fn delta_time(&self) -> f32;

    /// Whether programs may read the game controller right now
    fn controller_enabled(&self) -> bool {
        true
    }

    /// A controller reported an error; shown to the user, no eviction
    fn on_controller_error(&self, _car: usize, _code: Option<ErrorCode>) {}

    /// A session broke; the car should return to manual control
    fn on_session_broken(&self, _car: usize, _outcome: CallOutcome, _message: &str) {}

    /// The set of connected programs changed (one flag per car slot)
    fn on_connected_programs_changed(&self, _connected: &[bool]) {}
}
