//! # Integration Tests
//!
//! End-to-end tests over loopback UDP.
//!
//! Covers:
//! - Contract and configuration snapshots
//! - Connect handshake on the async port
//! - Lock-step calls against one and two controllers
//! - Fragmented image transfer and the exit broadcast

#[cfg(test)]
mod controller;

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BridgeBlueprint, Opcode};

    #[test]
    fn test_opcode_table_is_stable() {
        assert_eq!(Opcode::Connect.tag(), 1);
        assert_eq!(Opcode::PythonSendNext.tag(), 6);
        assert_eq!(Opcode::PhysicsGetAngularVelocity.tag(), 28);
        assert_eq!(Opcode::from_tag(29), None);
    }

    #[test]
    fn test_config_round_trip_through_toml() {
        let toml = r#"
            [network]
            sync_port = 6065
            async_port = 6064

            [simulation]
            num_cars = 2

            [[endpoints]]
            port = 7001
        "#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let rendered = ConfigLoader::to_toml(&blueprint).unwrap();
        let reloaded: BridgeBlueprint =
            ConfigLoader::load_from_str(&rendered, ConfigFormat::Toml).unwrap();

        assert_eq!(reloaded.network.sync_port, 6065);
        assert_eq!(reloaded.simulation.num_cars, 2);
        assert_eq!(reloaded.endpoints.len(), 1);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bridge::Bridge;
    use contracts::{
        BridgeBlueprint, CallOutcome, Camera, EndpointConfig, ErrorCode, Opcode, Racecar,
        Simulation,
    };
    use mock_sim::{MockConfig, MockSimulation, SimEvent};
    use observability::BridgeStatsAggregator;

    use crate::controller::TestController;

    fn blueprint(cars: usize, lockstep_ms: u64) -> BridgeBlueprint {
        let mut blueprint = BridgeBlueprint::default();
        blueprint.network.sync_port = 0;
        blueprint.network.async_port = 0;
        blueprint.simulation.num_cars = cars;
        blueprint.timeouts.lockstep_ms = lockstep_ms;
        blueprint.timeouts.async_fragment_ack_ms = 500;
        blueprint
    }

    async fn bridge(blueprint: BridgeBlueprint) -> (Arc<MockSimulation>, Bridge) {
        let sim = Arc::new(MockSimulation::new(MockConfig {
            num_cars: blueprint.simulation.num_cars,
            ..Default::default()
        }));
        let mut bridge = Bridge::bind(blueprint, sim.clone()).await.unwrap();
        assert!(bridge.spawn_side_channel());
        (sim, bridge)
    }

    #[tokio::test]
    async fn test_connect_handshake_assigns_slots() {
        let (sim, bridge) = bridge(blueprint(2, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();

        let first = TestController::bind().await;
        let second = TestController::bind().await;
        let third = TestController::bind().await;

        assert_eq!(first.connect(async_addr, 1).await, vec![1, 0]);
        assert_eq!(second.connect(async_addr, 1).await, vec![1, 1]);
        assert_eq!(
            third.connect(async_addr, 1).await,
            vec![0, ErrorCode::NoFreeCar.tag()]
        );

        assert_eq!(bridge.endpoint_count(), 2);
        assert_eq!(bridge.connected_programs(), vec![true, true]);
        assert!(sim
            .events()
            .contains(&SimEvent::ConnectedProgramsChanged(vec![true, true])));
    }

    #[tokio::test]
    async fn test_connect_version_mismatch() {
        let (_sim, bridge) = bridge(blueprint(1, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();
        let controller = TestController::bind().await;

        assert_eq!(
            controller.connect(async_addr, 0).await,
            vec![0, ErrorCode::PythonOutdated.tag()]
        );
        assert_eq!(
            controller.connect(async_addr, 2).await,
            vec![0, ErrorCode::RacecarsimOutdated.tag()]
        );
        assert_eq!(bridge.endpoint_count(), 0);
    }

    #[tokio::test]
    async fn test_lockstep_start_with_sub_requests() {
        let (sim, bridge) = bridge(blueprint(1, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();
        let controller = TestController::bind().await;
        assert_eq!(controller.connect(async_addr, 1).await, vec![1, 0]);

        let script = tokio::spawn(async move {
            let (call, sync_addr) = controller.recv().await;
            assert_eq!(call, vec![Opcode::UnityStart.tag()]);

            controller.send(&[Opcode::RacecarGetDeltaTime.tag()], sync_addr).await;
            let (reply, _) = controller.recv().await;
            assert_eq!(reply.len(), 4);

            controller.send(&TestController::drive(0.5, -0.25), sync_addr).await;
            controller.send(&[Opcode::PythonFinished.tag()], sync_addr).await;
            f32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]])
        });

        let report = bridge.handle_start().await;
        let delta_time = script.await.unwrap();

        assert_eq!(report.outcome_for(0), Some(CallOutcome::Finished));
        assert_eq!(report.sessions[0].sub_requests, 2);
        assert!(delta_time > 0.0);

        let state = sim.drive_state(0).unwrap();
        assert_eq!((state.speed, state.angle), (0.5, -0.25));
    }

    #[tokio::test]
    async fn test_color_image_reassembled_over_side_channel() {
        let (sim, bridge) = bridge(blueprint(1, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();
        let controller = TestController::bind().await;

        controller
            .send(&[Opcode::CameraGetColorImage.tag()], async_addr)
            .await;

        let mut image = Vec::new();
        for _ in 0..32 {
            let (fragment, from) = controller.recv().await;
            assert_eq!(from, async_addr);
            assert_eq!(fragment.len(), 640 * 480 * 4 / 32);
            image.extend_from_slice(&fragment);
            controller
                .send(&[Opcode::PythonSendNext.tag()], async_addr)
                .await;
        }

        let expected = sim.car(0).unwrap().camera().color_image();
        assert_eq!(image.len(), 614_400);
        assert_eq!(&image[..], &expected[..]);
    }

    #[tokio::test]
    async fn test_lidar_over_side_channel() {
        let (_sim, bridge) = bridge(blueprint(1, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();
        let controller = TestController::bind().await;

        controller
            .send(&[Opcode::LidarGetSamples.tag()], async_addr)
            .await;
        let (reply, _) = controller.recv().await;

        assert_eq!(reply.len(), 720 * 4);
        let first = f32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]);
        assert!(first > 0.0);
    }

    #[tokio::test]
    async fn test_silent_controller_is_evicted() {
        let first = TestController::bind().await;
        let second = TestController::bind().await;

        let mut blueprint = blueprint(2, 100);
        blueprint.endpoints = vec![
            EndpointConfig {
                host: None,
                port: first.addr().port(),
            },
            EndpointConfig {
                host: None,
                port: second.addr().port(),
            },
        ];
        let (sim, bridge) = bridge(blueprint).await;

        let responder = tokio::spawn(async move {
            let (call, sync_addr) = first.recv().await;
            assert_eq!(call, vec![Opcode::UnityUpdate.tag()]);
            first.send(&[Opcode::PythonFinished.tag()], sync_addr).await;

            // The other car timed out
            let (warning, _) = first.recv().await;
            assert_eq!(warning, vec![0, ErrorCode::Timeout.tag()]);
            first
        });

        let report = bridge.handle_update().await;
        let first = responder.await.unwrap();

        assert_eq!(report.outcome_for(0), Some(CallOutcome::Finished));
        assert_eq!(report.outcome_for(1), Some(CallOutcome::TimedOut));
        assert_eq!(bridge.connected_programs(), vec![true]);
        assert_eq!(bridge.endpoint_count(), 1);
        assert!(sim.is_manual(1));
        assert!(!sim.is_manual(0));
        drop(second);

        let mut stats = BridgeStatsAggregator::new();
        stats.record_call();
        for session in &report.sessions {
            stats.record_session(
                session.outcome,
                session.elapsed,
                session.sub_requests,
                session.controller_errors,
            );
        }
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.failures(), 1);

        // Only the surviving controller hears the next call
        let responder = tokio::spawn(async move {
            let (call, sync_addr) = first.recv().await;
            assert_eq!(call, vec![Opcode::UnityUpdate.tag()]);
            first.send(&[Opcode::PythonFinished.tag()], sync_addr).await;
        });
        let report = bridge.handle_update().await;
        responder.await.unwrap();

        assert_eq!(report.sessions.len(), 1);
        assert!(report.all_finished());
    }

    #[tokio::test]
    async fn test_python_exit_releases_slot() {
        let (_sim, bridge) = bridge(blueprint(1, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();
        let controller = TestController::bind().await;
        assert_eq!(controller.connect(async_addr, 1).await, vec![1, 0]);

        let script = tokio::spawn(async move {
            let (_, sync_addr) = controller.recv().await;
            controller.send(&[Opcode::PythonExit.tag()], sync_addr).await;
        });

        let report = bridge.handle_update().await;
        script.await.unwrap();

        assert_eq!(report.outcome_for(0), Some(CallOutcome::Disconnected));
        assert_eq!(bridge.endpoint_count(), 0);
    }

    #[tokio::test]
    async fn test_exit_broadcast() {
        let (_sim, mut bridge) = bridge(blueprint(2, 500)).await;
        let async_addr = bridge.local_async_addr().unwrap();

        let first = TestController::bind().await;
        let second = TestController::bind().await;
        first.connect(async_addr, 1).await;
        second.connect(async_addr, 1).await;

        bridge.handle_exit().await;

        for controller in [&first, &second] {
            let (datagram, _) = controller.recv().await;
            assert_eq!(datagram, vec![Opcode::UnityExit.tag()]);
        }
        assert!(bridge.is_exited());
        assert_eq!(bridge.endpoint_count(), 0);

        // A second exit is a no-op
        bridge.handle_exit().await;
        assert!(first.try_recv(Duration::from_millis(50)).await.is_none());
    }
}
