//! Opcode and error-code tables
//!
//! Tags are stable for one simulator build; both sides agree on the payload
//! layout per tag out-of-band.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol version exchanged in the connect handshake
pub const PROTOCOL_VERSION: u8 = 1;

/// Largest UDP payload accepted on Windows loopback
pub const MAX_DATAGRAM_SIZE: usize = 65507;

/// Default port for lock-step calls
pub const DEFAULT_SYNC_PORT: u16 = 5065;

/// Default port for the async (notebook) side-channel
pub const DEFAULT_ASYNC_PORT: u16 = 5064;

/// Number of fragments a color image is split into
pub const COLOR_IMAGE_FRAGMENTS: usize = 32;

/// Single-byte protocol message tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Opcode {
    Error = 0,
    Connect = 1,
    UnityStart = 2,
    UnityUpdate = 3,
    UnityExit = 4,
    PythonFinished = 5,
    PythonSendNext = 6,
    PythonExit = 7,
    RacecarGo = 8,
    RacecarSetStartUpdate = 9,
    RacecarGetDeltaTime = 10,
    RacecarSetUpdateSlowTime = 11,
    CameraGetColorImage = 12,
    CameraGetDepthImage = 13,
    CameraGetWidth = 14,
    CameraGetHeight = 15,
    ControllerIsDown = 16,
    ControllerWasPressed = 17,
    ControllerWasReleased = 18,
    ControllerGetTrigger = 19,
    ControllerGetJoystick = 20,
    DisplayShowImage = 21,
    DriveSetSpeedAngle = 22,
    DriveStop = 23,
    DriveSetMaxSpeed = 24,
    LidarGetNumSamples = 25,
    LidarGetSamples = 26,
    PhysicsGetLinearAcceleration = 27,
    PhysicsGetAngularVelocity = 28,
}

impl Opcode {
    const ALL: [Opcode; 29] = [
        Opcode::Error,
        Opcode::Connect,
        Opcode::UnityStart,
        Opcode::UnityUpdate,
        Opcode::UnityExit,
        Opcode::PythonFinished,
        Opcode::PythonSendNext,
        Opcode::PythonExit,
        Opcode::RacecarGo,
        Opcode::RacecarSetStartUpdate,
        Opcode::RacecarGetDeltaTime,
        Opcode::RacecarSetUpdateSlowTime,
        Opcode::CameraGetColorImage,
        Opcode::CameraGetDepthImage,
        Opcode::CameraGetWidth,
        Opcode::CameraGetHeight,
        Opcode::ControllerIsDown,
        Opcode::ControllerWasPressed,
        Opcode::ControllerWasReleased,
        Opcode::ControllerGetTrigger,
        Opcode::ControllerGetJoystick,
        Opcode::DisplayShowImage,
        Opcode::DriveSetSpeedAngle,
        Opcode::DriveStop,
        Opcode::DriveSetMaxSpeed,
        Opcode::LidarGetNumSamples,
        Opcode::LidarGetSamples,
        Opcode::PhysicsGetLinearAcceleration,
        Opcode::PhysicsGetAngularVelocity,
    ];

    /// Numeric tag
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Decode a tag, `None` for values outside the table
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    /// Protocol name, used in logs and metric labels
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Error => "error",
            Opcode::Connect => "connect",
            Opcode::UnityStart => "unity_start",
            Opcode::UnityUpdate => "unity_update",
            Opcode::UnityExit => "unity_exit",
            Opcode::PythonFinished => "python_finished",
            Opcode::PythonSendNext => "python_send_next",
            Opcode::PythonExit => "python_exit",
            Opcode::RacecarGo => "racecar_go",
            Opcode::RacecarSetStartUpdate => "racecar_set_start_update",
            Opcode::RacecarGetDeltaTime => "racecar_get_delta_time",
            Opcode::RacecarSetUpdateSlowTime => "racecar_set_update_slow_time",
            Opcode::CameraGetColorImage => "camera_get_color_image",
            Opcode::CameraGetDepthImage => "camera_get_depth_image",
            Opcode::CameraGetWidth => "camera_get_width",
            Opcode::CameraGetHeight => "camera_get_height",
            Opcode::ControllerIsDown => "controller_is_down",
            Opcode::ControllerWasPressed => "controller_was_pressed",
            Opcode::ControllerWasReleased => "controller_was_released",
            Opcode::ControllerGetTrigger => "controller_get_trigger",
            Opcode::ControllerGetJoystick => "controller_get_joystick",
            Opcode::DisplayShowImage => "display_show_image",
            Opcode::DriveSetSpeedAngle => "drive_set_speed_angle",
            Opcode::DriveStop => "drive_stop",
            Opcode::DriveSetMaxSpeed => "drive_set_max_speed",
            Opcode::LidarGetNumSamples => "lidar_get_num_samples",
            Opcode::LidarGetSamples => "lidar_get_samples",
            Opcode::PhysicsGetLinearAcceleration => "physics_get_linear_acceleration",
            Opcode::PhysicsGetAngularVelocity => "physics_get_angular_velocity",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        Self::from_tag(tag).ok_or(tag)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error code carried in byte 1 of an `error` datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ErrorCode {
    Generic = 0,
    Timeout = 1,
    PythonException = 2,
    NoFreeCar = 3,
    PythonOutdated = 4,
    RacecarsimOutdated = 5,
    FragmentMismatch = 6,
}

impl ErrorCode {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ErrorCode::Generic),
            1 => Some(ErrorCode::Timeout),
            2 => Some(ErrorCode::PythonException),
            3 => Some(ErrorCode::NoFreeCar),
            4 => Some(ErrorCode::PythonOutdated),
            5 => Some(ErrorCode::RacecarsimOutdated),
            6 => Some(ErrorCode::FragmentMismatch),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::Generic => "generic",
            ErrorCode::Timeout => "timeout",
            ErrorCode::PythonException => "python_exception",
            ErrorCode::NoFreeCar => "no_free_car",
            ErrorCode::PythonOutdated => "python_outdated",
            ErrorCode::RacecarsimOutdated => "racecarsim_outdated",
            ErrorCode::FragmentMismatch => "fragment_mismatch",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
