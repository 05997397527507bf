//! Mock racecar
//!
//! Generates synthetic sensor frames that change with the simulation tick,
//! and stores drive commands as last-write-wins atomics so the lock-step path
//! and the side-channel can touch the same car from different threads.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{
    Camera, Drive, DriveState, Lidar, Physics, Racecar, Vector3, LIDAR_NUM_SAMPLES,
};
use tracing::trace;

use crate::recorder::{Recorder, SimCall};
use crate::MockConfig;

/// `f32` stored as its bit pattern
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// One simulated car
#[derive(Debug)]
pub struct MockRacecar {
    index: usize,
    config: MockConfig,
    tick: Arc<AtomicU64>,
    recorder: Arc<Recorder>,
    speed: AtomicF32,
    angle: AtomicF32,
    max_speed: AtomicF32,
}

impl MockRacecar {
    pub(crate) fn new(
        index: usize,
        config: MockConfig,
        tick: Arc<AtomicU64>,
        recorder: Arc<Recorder>,
    ) -> Self {
        let max_speed = config.max_speed;
        Self {
            index,
            config,
            tick,
            recorder,
            speed: AtomicF32::new(0.0),
            angle: AtomicF32::new(0.0),
            max_speed: AtomicF32::new(max_speed),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Drive state without logging a call
    pub fn drive_state(&self) -> DriveState {
        DriveState {
            speed: self.speed.load(),
            angle: self.angle.load(),
            max_speed: self.max_speed.load(),
        }
    }

    fn tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    fn depth_dimensions(&self) -> (usize, usize) {
        let factor = self.config.depth_factor.max(1) as usize;
        (
            self.config.color_width as usize / factor,
            self.config.color_height as usize / factor,
        )
    }
}

impl Camera for MockRacecar {
    /// Gradient that shifts with every tick
    fn color_image(&self) -> Bytes {
        self.recorder.call(SimCall::ColorImage { car: self.index });
        let (w, h) = (self.config.color_width as usize, self.config.color_height as usize);
        let shift = self.tick() as usize;

        let mut buf = BytesMut::with_capacity(w * h * 4);
        for y in 0..h {
            for x in 0..w {
                buf.put_u8((x + shift) as u8);
                buf.put_u8(y as u8);
                buf.put_u8(self.index as u8);
                buf.put_u8(u8::MAX);
            }
        }
        buf.freeze()
    }

    /// Rows get further away towards the top of the frame
    fn depth_image(&self) -> Bytes {
        self.recorder.call(SimCall::DepthImage { car: self.index });
        let (w, h) = self.depth_dimensions();

        let mut buf = BytesMut::with_capacity(w * h * 4);
        for y in 0..h {
            let distance = 50.0 + (h - y) as f32 * 10.0;
            for _ in 0..w {
                buf.put_f32_le(distance);
            }
        }
        buf.freeze()
    }

    fn width(&self) -> i32 {
        self.recorder.call(SimCall::CameraWidth { car: self.index });
        self.config.color_width
    }

    fn height(&self) -> i32 {
        self.recorder.call(SimCall::CameraHeight { car: self.index });
        self.config.color_height
    }
}

impl Lidar for MockRacecar {
    /// A round room whose radius breathes with the tick
    fn samples(&self) -> Vec<f32> {
        self.recorder.call(SimCall::LidarSamples { car: self.index });
        let radius = 200.0 + (self.tick() % 100) as f32;
        (0..LIDAR_NUM_SAMPLES)
            .map(|i| {
                let angle = (i as f32 / LIDAR_NUM_SAMPLES as f32) * std::f32::consts::TAU;
                radius + 20.0 * (4.0 * angle).cos()
            })
            .collect()
    }

    fn num_samples(&self) -> i32 {
        self.recorder.call(SimCall::LidarNumSamples { car: self.index });
        LIDAR_NUM_SAMPLES as i32
    }
}

impl Physics for MockRacecar {
    fn linear_acceleration(&self) -> Vector3 {
        self.recorder.call(SimCall::LinearAcceleration { car: self.index });
        let state = self.drive_state();
        Vector3 {
            x: 0.0,
            y: 0.0,
            z: state.speed * state.max_speed * 10.0,
        }
    }

    fn angular_velocity(&self) -> Vector3 {
        self.recorder.call(SimCall::AngularVelocity { car: self.index });
        let state = self.drive_state();
        Vector3 {
            x: 0.0,
            y: state.speed * state.angle,
            z: 0.0,
        }
    }
}

impl Drive for MockRacecar {
    fn set_speed_angle(&self, speed: f32, angle: f32) {
        self.recorder.call(SimCall::SetSpeedAngle {
            car: self.index,
            speed,
            angle,
        });
        trace!(car = self.index, speed, angle, "Drive command");
        self.speed.store(speed.clamp(-1.0, 1.0));
        self.angle.store(angle.clamp(-1.0, 1.0));
    }

    fn stop(&self) {
        self.recorder.call(SimCall::Stop { car: self.index });
        self.speed.store(0.0);
        self.angle.store(0.0);
    }

    fn set_max_speed(&self, max_speed: f32) {
        self.recorder.call(SimCall::SetMaxSpeed {
            car: self.index,
            max_speed,
        });
        self.max_speed.store(max_speed.clamp(0.0, 1.0));
    }

    fn state(&self) -> DriveState {
        self.drive_state()
    }
}

impl Racecar for MockRacecar {
    fn camera(&self) -> &dyn Camera {
        self
    }

    fn lidar(&self) -> &dyn Lidar {
        self
    }

    fn physics(&self) -> &dyn Physics {
        self
    }

    fn drive(&self) -> &dyn Drive {
        self
    }
}
