//! Wire codec
//!
//! Byte 0 of every datagram is the opcode tag. Arguments sit at fixed
//! offsets; scalars are little-endian. Drive arguments follow the
//! controller's struct packing, so the first float starts at offset 4.

use bytes::{BufMut, Bytes, BytesMut};
use contracts::{Button, ErrorCode, Joystick, Opcode, Trigger, Vector2, Vector3};

use crate::error::DecodeError;

/// Offset of the first float argument of a drive command
const DRIVE_ARG_OFFSET: usize = 4;

/// Request sent by a controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Request {
    /// Controller-reported error with an optional code
    Error(Option<ErrorCode>),
    /// Handshake carrying the controller's protocol version
    Connect { version: u8 },
    Finished,
    SendNext,
    Exit,
    /// One sensor/actuator operation
    Collaborator(CollaboratorCall),
    /// Known tag the simulator does not service
    Unsupported(Opcode),
}

/// Operation against a car or the game controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollaboratorCall {
    DeltaTime,
    ColorImage,
    DepthImage,
    CameraWidth,
    CameraHeight,
    IsDown(Button),
    WasPressed(Button),
    WasReleased(Button),
    Trigger(Trigger),
    Joystick(Joystick),
    SetSpeedAngle { speed: f32, angle: f32 },
    Stop,
    SetMaxSpeed(f32),
    LidarNumSamples,
    LidarSamples,
    LinearAcceleration,
    AngularVelocity,
}

impl CollaboratorCall {
    pub fn opcode(self) -> Opcode {
        match self {
            CollaboratorCall::DeltaTime => Opcode::RacecarGetDeltaTime,
            CollaboratorCall::ColorImage => Opcode::CameraGetColorImage,
            CollaboratorCall::DepthImage => Opcode::CameraGetDepthImage,
            CollaboratorCall::CameraWidth => Opcode::CameraGetWidth,
            CollaboratorCall::CameraHeight => Opcode::CameraGetHeight,
            CollaboratorCall::IsDown(_) => Opcode::ControllerIsDown,
            CollaboratorCall::WasPressed(_) => Opcode::ControllerWasPressed,
            CollaboratorCall::WasReleased(_) => Opcode::ControllerWasReleased,
            CollaboratorCall::Trigger(_) => Opcode::ControllerGetTrigger,
            CollaboratorCall::Joystick(_) => Opcode::ControllerGetJoystick,
            CollaboratorCall::SetSpeedAngle { .. } => Opcode::DriveSetSpeedAngle,
            CollaboratorCall::Stop => Opcode::DriveStop,
            CollaboratorCall::SetMaxSpeed(_) => Opcode::DriveSetMaxSpeed,
            CollaboratorCall::LidarNumSamples => Opcode::LidarGetNumSamples,
            CollaboratorCall::LidarSamples => Opcode::LidarGetSamples,
            CollaboratorCall::LinearAcceleration => Opcode::PhysicsGetLinearAcceleration,
            CollaboratorCall::AngularVelocity => Opcode::PhysicsGetAngularVelocity,
        }
    }

    /// Camera, LIDAR and IMU reads (the side-channel's repertoire)
    pub fn is_sensor_read(self) -> bool {
        matches!(
            self,
            CollaboratorCall::ColorImage
                | CollaboratorCall::DepthImage
                | CollaboratorCall::CameraWidth
                | CollaboratorCall::CameraHeight
                | CollaboratorCall::LidarNumSamples
                | CollaboratorCall::LidarSamples
                | CollaboratorCall::LinearAcceleration
                | CollaboratorCall::AngularVelocity
        )
    }

    /// Actuator writes produce no reply
    pub fn is_write(self) -> bool {
        matches!(
            self,
            CollaboratorCall::SetSpeedAngle { .. }
                | CollaboratorCall::Stop
                | CollaboratorCall::SetMaxSpeed(_)
        )
    }
}

impl Request {
    /// Decode one datagram
    pub fn parse(datagram: &[u8]) -> Result<Self, DecodeError> {
        let (&tag, _) = datagram.split_first().ok_or(DecodeError::Empty)?;
        let opcode = Opcode::from_tag(tag).ok_or(DecodeError::UnknownOpcode(tag))?;

        let request = match opcode {
            Opcode::Error => Request::Error(datagram.get(1).copied().and_then(ErrorCode::from_tag)),
            Opcode::Connect => Request::Connect {
                version: datagram.get(1).copied().unwrap_or(0),
            },
            Opcode::PythonFinished => Request::Finished,
            Opcode::PythonSendNext => Request::SendNext,
            Opcode::PythonExit => Request::Exit,
            Opcode::RacecarGetDeltaTime => Request::Collaborator(CollaboratorCall::DeltaTime),
            Opcode::CameraGetColorImage => Request::Collaborator(CollaboratorCall::ColorImage),
            Opcode::CameraGetDepthImage => Request::Collaborator(CollaboratorCall::DepthImage),
            Opcode::CameraGetWidth => Request::Collaborator(CollaboratorCall::CameraWidth),
            Opcode::CameraGetHeight => Request::Collaborator(CollaboratorCall::CameraHeight),
            Opcode::ControllerIsDown => {
                Request::Collaborator(CollaboratorCall::IsDown(button(opcode, datagram)?))
            }
            Opcode::ControllerWasPressed => {
                Request::Collaborator(CollaboratorCall::WasPressed(button(opcode, datagram)?))
            }
            Opcode::ControllerWasReleased => {
                Request::Collaborator(CollaboratorCall::WasReleased(button(opcode, datagram)?))
            }
            Opcode::ControllerGetTrigger => {
                let id = input_id(opcode, datagram)?;
                let trigger = Trigger::from_tag(id)
                    .ok_or(DecodeError::InvalidInput { opcode, value: id })?;
                Request::Collaborator(CollaboratorCall::Trigger(trigger))
            }
            Opcode::ControllerGetJoystick => {
                let id = input_id(opcode, datagram)?;
                let joystick = Joystick::from_tag(id)
                    .ok_or(DecodeError::InvalidInput { opcode, value: id })?;
                Request::Collaborator(CollaboratorCall::Joystick(joystick))
            }
            Opcode::DriveSetSpeedAngle => {
                let speed = read_f32(opcode, datagram, DRIVE_ARG_OFFSET)?;
                let angle = read_f32(opcode, datagram, DRIVE_ARG_OFFSET + 4)?;
                Request::Collaborator(CollaboratorCall::SetSpeedAngle { speed, angle })
            }
            Opcode::DriveStop => Request::Collaborator(CollaboratorCall::Stop),
            Opcode::DriveSetMaxSpeed => Request::Collaborator(CollaboratorCall::SetMaxSpeed(
                read_f32(opcode, datagram, DRIVE_ARG_OFFSET)?,
            )),
            Opcode::LidarGetNumSamples => Request::Collaborator(CollaboratorCall::LidarNumSamples),
            Opcode::LidarGetSamples => Request::Collaborator(CollaboratorCall::LidarSamples),
            Opcode::PhysicsGetLinearAcceleration => {
                Request::Collaborator(CollaboratorCall::LinearAcceleration)
            }
            Opcode::PhysicsGetAngularVelocity => {
                Request::Collaborator(CollaboratorCall::AngularVelocity)
            }
            Opcode::UnityStart
            | Opcode::UnityUpdate
            | Opcode::UnityExit
            | Opcode::RacecarGo
            | Opcode::RacecarSetStartUpdate
            | Opcode::RacecarSetUpdateSlowTime
            | Opcode::DisplayShowImage => Request::Unsupported(opcode),
        };

        Ok(request)
    }
}

fn input_id(opcode: Opcode, datagram: &[u8]) -> Result<u8, DecodeError> {
    datagram.get(1).copied().ok_or(DecodeError::Truncated {
        opcode,
        expected: 2,
        got: datagram.len(),
    })
}

fn button(opcode: Opcode, datagram: &[u8]) -> Result<Button, DecodeError> {
    let id = input_id(opcode, datagram)?;
    Button::from_tag(id).ok_or(DecodeError::InvalidInput { opcode, value: id })
}

fn read_f32(opcode: Opcode, datagram: &[u8], offset: usize) -> Result<f32, DecodeError> {
    datagram
        .get(offset..offset + 4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(f32::from_le_bytes)
        .ok_or(DecodeError::Truncated {
            opcode,
            expected: offset + 4,
            got: datagram.len(),
        })
}

pub fn encode_f32(value: f32) -> Bytes {
    Bytes::copy_from_slice(&value.to_le_bytes())
}

pub fn encode_i32(value: i32) -> Bytes {
    Bytes::copy_from_slice(&value.to_le_bytes())
}

pub fn encode_bool(value: bool) -> Bytes {
    Bytes::copy_from_slice(&[u8::from(value)])
}

pub fn encode_vector2(value: Vector2) -> Bytes {
    let mut buf = BytesMut::with_capacity(8);
    buf.put_f32_le(value.x);
    buf.put_f32_le(value.y);
    buf.freeze()
}

pub fn encode_vector3(value: Vector3) -> Bytes {
    let mut buf = BytesMut::with_capacity(12);
    buf.put_f32_le(value.x);
    buf.put_f32_le(value.y);
    buf.put_f32_le(value.z);
    buf.freeze()
}

pub fn encode_f32_slice(values: &[f32]) -> Bytes {
    let mut buf = BytesMut::with_capacity(values.len() * 4);
    for value in values {
        buf.put_f32_le(*value);
    }
    buf.freeze()
}

/// `[opcode]`
pub fn opcode_datagram(opcode: Opcode) -> Bytes {
    Bytes::copy_from_slice(&[opcode.tag()])
}

/// `[error, code]`
pub fn error_datagram(code: ErrorCode) -> Bytes {
    Bytes::copy_from_slice(&[Opcode::Error.tag(), code.tag()])
}

/// `[connect, slot]`
pub fn connect_ack(slot: u8) -> Bytes {
    Bytes::copy_from_slice(&[Opcode::Connect.tag(), slot])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive_datagram(opcode: Opcode, args: &[f32]) -> Vec<u8> {
        let mut datagram = vec![opcode.tag(), 0, 0, 0];
        for arg in args {
            datagram.extend_from_slice(&arg.to_le_bytes());
        }
        datagram
    }

    #[test]
    fn test_parse_control_messages() {
        assert_eq!(Request::parse(&[5]), Ok(Request::Finished));
        assert_eq!(Request::parse(&[6]), Ok(Request::SendNext));
        assert_eq!(Request::parse(&[7]), Ok(Request::Exit));
        assert_eq!(
            Request::parse(&[0, 2]),
            Ok(Request::Error(Some(ErrorCode::PythonException)))
        );
        assert_eq!(Request::parse(&[0]), Ok(Request::Error(None)));
    }

    #[test]
    fn test_parse_connect_version() {
        assert_eq!(Request::parse(&[1, 1]), Ok(Request::Connect { version: 1 }));
        assert_eq!(Request::parse(&[1]), Ok(Request::Connect { version: 0 }));
    }

    #[test]
    fn test_parse_speed_angle_offsets() {
        let datagram = drive_datagram(Opcode::DriveSetSpeedAngle, &[0.5, -0.2]);
        assert_eq!(
            Request::parse(&datagram),
            Ok(Request::Collaborator(CollaboratorCall::SetSpeedAngle {
                speed: 0.5,
                angle: -0.2
            }))
        );
    }

    #[test]
    fn test_parse_max_speed() {
        let datagram = drive_datagram(Opcode::DriveSetMaxSpeed, &[0.75]);
        assert_eq!(
            Request::parse(&datagram),
            Ok(Request::Collaborator(CollaboratorCall::SetMaxSpeed(0.75)))
        );
    }

    #[test]
    fn test_parse_truncated_drive_command() {
        let err = Request::parse(&[Opcode::DriveSetSpeedAngle.tag(), 0, 0, 0, 1, 2]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                opcode: Opcode::DriveSetSpeedAngle,
                expected: 8,
                got: 6
            }
        );
    }

    #[test]
    fn test_parse_input_ids() {
        assert_eq!(
            Request::parse(&[Opcode::ControllerWasPressed.tag(), 8]),
            Ok(Request::Collaborator(CollaboratorCall::WasPressed(Button::Start)))
        );
        assert_eq!(
            Request::parse(&[Opcode::ControllerGetJoystick.tag(), 1]),
            Ok(Request::Collaborator(CollaboratorCall::Joystick(Joystick::Right)))
        );
        assert!(matches!(
            Request::parse(&[Opcode::ControllerGetTrigger.tag(), 9]),
            Err(DecodeError::InvalidInput { value: 9, .. })
        ));
        assert!(matches!(
            Request::parse(&[Opcode::ControllerIsDown.tag()]),
            Err(DecodeError::Truncated { expected: 2, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_empty_and_unknown() {
        assert_eq!(Request::parse(&[]), Err(DecodeError::Empty));
        assert_eq!(Request::parse(&[200]), Err(DecodeError::UnknownOpcode(200)));
    }

    #[test]
    fn test_unserviced_tags_are_unsupported() {
        assert_eq!(
            Request::parse(&[Opcode::DisplayShowImage.tag(), 1, 2, 3]),
            Ok(Request::Unsupported(Opcode::DisplayShowImage))
        );
        assert_eq!(
            Request::parse(&[Opcode::RacecarGo.tag()]),
            Ok(Request::Unsupported(Opcode::RacecarGo))
        );
    }

    #[test]
    fn test_encoders_are_little_endian() {
        assert_eq!(&encode_i32(640)[..], &[0x80, 0x02, 0, 0]);
        assert_eq!(&encode_f32(1.0)[..], &1.0f32.to_le_bytes());
        assert_eq!(&encode_bool(true)[..], &[1]);
        let v = encode_vector3(Vector3 { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(v.len(), 12);
        assert_eq!(&v[8..], &3.0f32.to_le_bytes());
        assert_eq!(encode_f32_slice(&[0.0; 720]).len(), 2880);
    }

    #[test]
    fn test_fixed_datagrams() {
        assert_eq!(&error_datagram(ErrorCode::Timeout)[..], &[0, 1]);
        assert_eq!(&connect_ack(1)[..], &[1, 1]);
        assert_eq!(&opcode_datagram(Opcode::UnityExit)[..], &[4]);
    }

    #[test]
    fn test_sensor_read_classification() {
        assert!(CollaboratorCall::LidarSamples.is_sensor_read());
        assert!(!CollaboratorCall::DeltaTime.is_sensor_read());
        assert!(!CollaboratorCall::Stop.is_sensor_read());
        assert!(CollaboratorCall::Stop.is_write());
        assert_eq!(
            CollaboratorCall::Trigger(Trigger::Left).opcode(),
            Opcode::ControllerGetTrigger
        );
    }
}
