//! # Mock Sim
//!
//! Headless stand-in for the racecar simulation.
//!
//! Responsibilities:
//! - Synthetic camera, depth, LIDAR and IMU frames
//! - Drive actuator with last-write-wins state
//! - Scriptable game controller
//! - Log of every collaborator call and bridge notification for tests

mod controller;
mod racecar;
mod recorder;
mod simulation;

pub use controller::MockController;
pub use racecar::MockRacecar;
pub use recorder::{Recorder, SimCall, SimEvent};
pub use simulation::MockSimulation;

use contracts::{COLOR_HEIGHT, COLOR_WIDTH};

/// Mock simulation configuration
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Number of cars
    pub num_cars: usize,
    /// Color camera width (pixels)
    pub color_width: i32,
    /// Color camera height (pixels)
    pub color_height: i32,
    /// Depth image is the color size divided by this
    pub depth_factor: i32,
    /// Initial seconds per tick
    pub delta_time: f32,
    /// Initial drive speed scale
    pub max_speed: f32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_cars: 1,
            color_width: COLOR_WIDTH,
            color_height: COLOR_HEIGHT,
            depth_factor: 8,
            delta_time: 1.0 / 60.0,
            max_speed: 0.25,
        }
    }
}
