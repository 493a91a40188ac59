use anyhow::{Context, Result};
use arsense_core::common::types::GeoReading;
use arsense_core::config::RigConfig;
use arsense_core::platform::{PlatformServices, SimulatedPlatform};
use arsense_core::status::StatusBoard;
use arsense_core::SensorRig;
use nalgebra::UnitQuaternion;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FRAME: Duration = Duration::from_millis(16);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "arsense_core=debug,sensor_rig=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Initializing sensor rig...");

    // A phone that prompts for every permission and takes a moment to get a fix
    let platform = Rc::new(SimulatedPlatform::new());
    platform.set_android(true);
    platform.set_fix(GeoReading::new(35.6812, 139.7671, 40.0));
    platform.set_true_heading(45.0);
    platform.set_attitude(
        UnitQuaternion::from_euler_angles(0.2, -0.1, 0.8).into_inner(),
    );

    let mut params = HashMap::new();
    params.insert("desired_accuracy_m".to_string(), 5.0);
    params.insert("initial_focus".to_string(), 1.0);
    let config = RigConfig::from_params(&params).context("invalid rig parameters")?;

    let board = Rc::new(StatusBoard::new());
    let rig = SensorRig::new(&PlatformServices::simulated(&platform), &config, board.clone());

    let orchestrator = rig.orchestrator();
    let (report, frames) = tokio::join!(orchestrator.start(), async {
        // the permission dialogs take focus away for a while
        rig.on_focus_changed(false);
        tokio::time::sleep(Duration::from_millis(400)).await;
        rig.on_focus_changed(true);

        let mut frames = 0u32;
        while !orchestrator.is_ready() {
            rig.tick_with_delta(FRAME);
            frames += 1;
            tokio::time::sleep(FRAME).await;
        }
        frames
    });

    for (name, outcome) in &report.entries {
        tracing::info!("{}: {:?}", name, outcome);
    }
    tracing::info!("All running: {} after {} frames", report.all_running(), frames);

    if rig.location().is_running() {
        let fix = rig.location().current_location();
        tracing::info!(
            "Location: lat={} lon={} alt={} heading={}",
            fix.latitude,
            fix.longitude,
            fix.altitude,
            rig.location().current_heading()
        );
    }

    for _ in 0..30 {
        rig.tick_with_delta(FRAME);
    }
    let angles = rig.orientation().euler_angles();
    tracing::info!(
        "Camera rotation (deg): roll={:.1} pitch={:.1} yaw={:.1}",
        angles.x,
        angles.y,
        angles.z
    );
    tracing::info!(
        "Camera device: {}",
        rig.capture().active_device().unwrap_or_else(|| "none".to_string())
    );

    rig.shutdown();
    tracing::info!("Status panel:\n{}", board.text());

    Ok(())
}
