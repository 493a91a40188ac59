use arsense_core::common::types::GeoReading;
use arsense_core::config::RigConfig;
use arsense_core::lifecycle::{ActivationOutcome, SensorLifecycle, SensorState};
use arsense_core::platform::{
    AuthorizationService, AuthorizationState, Capability, CaptureDevice, DeviceKind,
    PlatformServices, SimulatedPlatform,
};
use arsense_core::status::StatusBoard;
use arsense_core::{SensorError, SensorRig};
use nalgebra::{Quaternion, UnitQuaternion};
use std::rc::Rc;
use std::time::Duration;
use tokio::time::timeout;

fn rig(platform: &Rc<SimulatedPlatform>, initial_focus: bool) -> (SensorRig, Rc<StatusBoard>) {
    let mut config = RigConfig::default();
    config.focus.initial_focus = initial_focus;
    let board = Rc::new(StatusBoard::new());
    let rig = SensorRig::new(&PlatformServices::simulated(platform), &config, board.clone());
    (rig, board)
}

#[tokio::test(start_paused = true)]
async fn capture_prompt_then_rear_camera() {
    let platform = Rc::new(SimulatedPlatform::new());
    platform.set_devices(vec![
        CaptureDevice::new("front", true, DeviceKind::WideAngle),
        CaptureDevice::new("rear", false, DeviceKind::WideAngle),
    ]);
    let (rig, _) = rig(&platform, true);

    assert_eq!(platform.query(Capability::Capture), AuthorizationState::Unknown);
    let outcome = rig.capture().activate().await;

    assert_eq!(outcome, ActivationOutcome::Running);
    assert_eq!(platform.prompts_shown(), 1);
    assert_eq!(rig.capture().active_device().as_deref(), Some("rear"));
    assert_eq!(rig.capture().state(), SensorState::Running);
}

#[tokio::test(start_paused = true)]
async fn all_sensors_become_ready() {
    let platform = Rc::new(SimulatedPlatform::new());
    let (rig, board) = rig(&platform, true);

    let report = rig.start().await;

    assert!(report.all_running(), "{report:?}");
    assert!(board.contains("All sensors finished"));
    assert_eq!(board.lines().last().map(String::as_str), Some("All sensors finished"));
}

#[tokio::test(start_paused = true)]
async fn one_denied_sensor_does_not_hang_readiness() {
    let platform = Rc::new(SimulatedPlatform::new());
    platform.set_prompt_answer(Capability::Capture, AuthorizationState::Denied);
    let (rig, _) = rig(&platform, true);

    let report = timeout(Duration::from_secs(60), rig.start())
        .await
        .expect("readiness must not hang");

    assert_eq!(
        report.outcome("capture"),
        Some(&ActivationOutcome::Degraded(SensorError::PermissionDenied(
            Capability::Capture
        )))
    );
    assert_eq!(report.outcome("location"), Some(&ActivationOutcome::Running));
    assert_eq!(report.outcome("orientation"), Some(&ActivationOutcome::Running));
}

#[tokio::test(start_paused = true)]
async fn readiness_waits_for_focus() {
    let platform = Rc::new(SimulatedPlatform::new());
    let (rig, _) = rig(&platform, false);
    let orchestrator = rig.orchestrator();

    let (report, was_ready_early) = tokio::join!(orchestrator.start(), async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        let early = orchestrator.is_ready();
        assert_eq!(rig.location().state(), SensorState::AwaitingFocus);
        rig.on_focus_changed(true);
        early
    });

    assert!(!was_ready_early);
    assert!(report.all_running());
}

#[tokio::test(start_paused = true)]
async fn destroying_one_sensor_leaves_siblings_alone() {
    let platform = Rc::new(SimulatedPlatform::new());
    let (rig, _) = rig(&platform, false);
    let orchestrator = rig.orchestrator();

    let (report, _) = tokio::join!(orchestrator.start(), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        rig.orientation().destroy();
        rig.on_focus_changed(true);
    });

    assert_eq!(report.outcome("orientation"), Some(&ActivationOutcome::Cancelled));
    assert_eq!(report.outcome("capture"), Some(&ActivationOutcome::Running));
    assert_eq!(report.outcome("location"), Some(&ActivationOutcome::Running));
}

#[tokio::test(start_paused = true)]
async fn location_reads_are_gated_on_running_status() {
    let platform = Rc::new(SimulatedPlatform::new());
    let fix = GeoReading::new(48.8584, 2.2945, 35.0);
    platform.set_fix(fix);
    let (rig, _) = rig(&platform, true);

    assert_eq!(rig.location().current_location(), GeoReading::zero());

    rig.start().await;
    assert_eq!(rig.location().current_location(), fix);
}

#[tokio::test(start_paused = true)]
async fn fusion_ticks_alongside_activation() {
    let platform = Rc::new(SimulatedPlatform::new());
    platform.set_android(true);
    // raw (x, y, z, w) = (0, 0, 1, 0)
    platform.set_attitude(Quaternion::new(0.0, 0.0, 0.0, 1.0));
    let (rig, _) = rig(&platform, false);
    let orchestrator = rig.orchestrator();

    let (report, _) = tokio::join!(orchestrator.start(), async {
        for _ in 0..10 {
            rig.tick();
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
        assert!(rig.orientation().display_rotation() != UnitQuaternion::identity());
        rig.on_focus_changed(true);
    });
    assert!(report.all_running());

    // once resolved, the Android profile pulls the camera toward its corrected target
    let profile = rig.orientation().profile();
    assert_eq!(profile.horizontal_offset_deg, -90.0);
    for _ in 0..200 {
        rig.tick();
    }
    let expected = UnitQuaternion::new_normalize(Quaternion::new(0.5, 0.5, 0.5, -0.5));
    assert!(rig.orientation().display_rotation().angle_to(&expected) < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_everything() {
    let platform = Rc::new(SimulatedPlatform::new());
    let (rig, _) = rig(&platform, true);

    rig.start().await;
    assert_eq!(platform.open_streams().len(), 1);

    rig.shutdown();
    assert!(platform.open_streams().is_empty());
    assert!(!platform.compass_enabled());
    assert!(!rig.location().is_running());
    for state in [rig.capture().state(), rig.location().state(), rig.orientation().state()] {
        assert_eq!(state, SensorState::Stopped);
    }
}

#[tokio::test(start_paused = true)]
async fn overlapping_starts_wait_for_the_same_activations() {
    let platform = Rc::new(SimulatedPlatform::new());
    let (rig, board) = rig(&platform, false);
    let first = rig.orchestrator();
    let second = rig.orchestrator();

    let (first_report, second_report, finished_early) = tokio::join!(
        first.start(),
        async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            second.start().await
        },
        async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let early = first.is_ready() || second.is_ready();
            let early = early || board.contains("All sensors finished");
            assert!(rig.location().state().is_activating());
            rig.on_focus_changed(true);
            early
        }
    );

    assert!(!finished_early);
    assert!(first_report.all_running(), "{first_report:?}");
    assert!(second_report.all_running(), "{second_report:?}");
    assert_eq!(platform.open_streams().len(), 1);
    let finished = board
        .lines()
        .iter()
        .filter(|line| line.as_str() == "All sensors finished")
        .count();
    assert_eq!(finished, 2);
}
