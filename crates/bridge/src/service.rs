//! Sub-request servicing
//!
//! Maps one decoded collaborator call to exactly one operation on the
//! simulation and encodes the reply.

use bytes::Bytes;
use contracts::{ProtocolConfig, Racecar, Simulation, Vector2};
use tracing::warn;

use crate::codec::{
    encode_bool, encode_f32, encode_f32_slice, encode_i32, encode_vector2, encode_vector3,
    CollaboratorCall,
};

/// Reply produced for one collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// One datagram
    Single(Bytes),
    /// Sent through the fragmentation transport
    Fragmented { payload: Bytes, fragments: usize },
    /// Actuator writes, or a read against a car that does not exist
    Empty,
}

/// Perform `call` against car `car` and encode the result
pub fn respond(
    call: CollaboratorCall,
    car: usize,
    sim: &dyn Simulation,
    protocol: &ProtocolConfig,
) -> Response {
    match call {
        CollaboratorCall::DeltaTime => Response::Single(encode_f32(sim.delta_time())),
        CollaboratorCall::IsDown(_)
        | CollaboratorCall::WasPressed(_)
        | CollaboratorCall::WasReleased(_)
        | CollaboratorCall::Trigger(_)
        | CollaboratorCall::Joystick(_) => Response::Single(controller_reply(call, sim)),
        _ => match sim.car(car) {
            Some(racecar) => car_reply(call, racecar, protocol),
            None => {
                warn!(car, opcode = %call.opcode(), "No such car, request dropped");
                Response::Empty
            }
        },
    }
}

fn car_reply(call: CollaboratorCall, racecar: &dyn Racecar, protocol: &ProtocolConfig) -> Response {
    match call {
        CollaboratorCall::ColorImage => Response::Fragmented {
            payload: racecar.camera().color_image(),
            fragments: protocol.color_fragments,
        },
        CollaboratorCall::DepthImage => {
            let payload = racecar.camera().depth_image();
            match protocol.depth_fragments {
                Some(fragments) => Response::Fragmented { payload, fragments },
                None => Response::Single(payload),
            }
        }
        CollaboratorCall::CameraWidth => Response::Single(encode_i32(racecar.camera().width())),
        CollaboratorCall::CameraHeight => Response::Single(encode_i32(racecar.camera().height())),
        CollaboratorCall::SetSpeedAngle { speed, angle } => {
            racecar.drive().set_speed_angle(speed, angle);
            Response::Empty
        }
        CollaboratorCall::Stop => {
            racecar.drive().stop();
            Response::Empty
        }
        CollaboratorCall::SetMaxSpeed(max_speed) => {
            racecar.drive().set_max_speed(max_speed);
            Response::Empty
        }
        CollaboratorCall::LidarNumSamples => {
            Response::Single(encode_i32(racecar.lidar().num_samples()))
        }
        CollaboratorCall::LidarSamples => {
            Response::Single(encode_f32_slice(&racecar.lidar().samples()))
        }
        CollaboratorCall::LinearAcceleration => {
            Response::Single(encode_vector3(racecar.physics().linear_acceleration()))
        }
        CollaboratorCall::AngularVelocity => {
            Response::Single(encode_vector3(racecar.physics().angular_velocity()))
        }
        // Answered without a car
        _ => Response::Empty,
    }
}

/// Controller reads answer neutral values while input is hidden from programs
fn controller_reply(call: CollaboratorCall, sim: &dyn Simulation) -> Bytes {
    let enabled = sim.controller_enabled();
    let controller = sim.controller();

    match call {
        CollaboratorCall::IsDown(button) => encode_bool(enabled && controller.is_down(button)),
        CollaboratorCall::WasPressed(button) => {
            encode_bool(enabled && controller.was_pressed(button))
        }
        CollaboratorCall::WasReleased(button) => {
            encode_bool(enabled && controller.was_released(button))
        }
        CollaboratorCall::Trigger(trigger) if enabled => encode_f32(controller.trigger(trigger)),
        CollaboratorCall::Trigger(_) => encode_f32(0.0),
        CollaboratorCall::Joystick(joystick) if enabled => {
            encode_vector2(controller.joystick(joystick))
        }
        _ => encode_vector2(Vector2::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Button, Joystick, Trigger};
    use mock_sim::{MockConfig, MockSimulation, SimCall};

    fn sim() -> MockSimulation {
        MockSimulation::new(MockConfig::default())
    }

    #[test]
    fn test_write_only_calls_have_no_reply() {
        let sim = sim();
        let protocol = ProtocolConfig::default();
        let response = respond(
            CollaboratorCall::SetSpeedAngle {
                speed: 0.5,
                angle: -0.2,
            },
            0,
            &sim,
            &protocol,
        );
        assert_eq!(response, Response::Empty);

        let state = sim.drive_state(0).unwrap();
        assert_eq!(state.speed, 0.5);
        assert_eq!(state.angle, -0.2);
        assert_eq!(
            sim.calls(),
            vec![SimCall::SetSpeedAngle {
                car: 0,
                speed: 0.5,
                angle: -0.2
            }]
        );
    }

    #[test]
    fn test_color_image_is_fragmented() {
        let sim = sim();
        let protocol = ProtocolConfig::default();
        match respond(CollaboratorCall::ColorImage, 0, &sim, &protocol) {
            Response::Fragmented { payload, fragments } => {
                assert_eq!(payload.len(), 640 * 480 * 4);
                assert_eq!(fragments, 32);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_depth_image_single_shot_by_default() {
        let sim = sim();
        let mut protocol = ProtocolConfig::default();
        assert!(matches!(
            respond(CollaboratorCall::DepthImage, 0, &sim, &protocol),
            Response::Single(_)
        ));

        protocol.depth_fragments = Some(4);
        assert!(matches!(
            respond(CollaboratorCall::DepthImage, 0, &sim, &protocol),
            Response::Fragmented { fragments: 4, .. }
        ));
    }

    #[test]
    fn test_lidar_and_dimensions() {
        let sim = sim();
        let protocol = ProtocolConfig::default();
        assert_eq!(
            respond(CollaboratorCall::LidarNumSamples, 0, &sim, &protocol),
            Response::Single(encode_i32(720))
        );
        match respond(CollaboratorCall::LidarSamples, 0, &sim, &protocol) {
            Response::Single(bytes) => assert_eq!(bytes.len(), 720 * 4),
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(
            respond(CollaboratorCall::CameraWidth, 0, &sim, &protocol),
            Response::Single(encode_i32(640))
        );
    }

    #[test]
    fn test_controller_gating() {
        let sim = sim();
        let protocol = ProtocolConfig::default();
        sim.mock_controller().set_down(Button::A, true);
        sim.mock_controller().set_trigger(Trigger::Right, 0.8);
        sim.mock_controller()
            .set_joystick(Joystick::Left, Vector2 { x: 0.5, y: -1.0 });

        let is_down = CollaboratorCall::IsDown(Button::A);
        let trigger = CollaboratorCall::Trigger(Trigger::Right);
        let joystick = CollaboratorCall::Joystick(Joystick::Left);

        assert_eq!(
            respond(is_down, 0, &sim, &protocol),
            Response::Single(encode_bool(true))
        );
        assert_eq!(
            respond(trigger, 0, &sim, &protocol),
            Response::Single(encode_f32(0.8))
        );

        sim.set_controller_enabled(false);
        assert_eq!(
            respond(is_down, 0, &sim, &protocol),
            Response::Single(encode_bool(false))
        );
        assert_eq!(
            respond(trigger, 0, &sim, &protocol),
            Response::Single(encode_f32(0.0))
        );
        assert_eq!(
            respond(joystick, 0, &sim, &protocol),
            Response::Single(encode_vector2(Vector2::default()))
        );
    }

    #[test]
    fn test_missing_car_drops_request() {
        let sim = sim();
        let protocol = ProtocolConfig::default();
        assert_eq!(
            respond(CollaboratorCall::Stop, 7, &sim, &protocol),
            Response::Empty
        );
        assert!(sim.calls().is_empty());
    }
}
