//! Attitude sensor driving the camera rotation

use crate::config::FusionConfig;
use crate::fusion::{OrientationFusion, PlatformProfile};
use crate::lifecycle::{ActivationOutcome, FocusGate, SensorBase, SensorLifecycle, SensorState};
use crate::platform::{AttitudeService, PlatformProbe};
use crate::status::StatusSink;
use async_trait::async_trait;
use nalgebra::{UnitQuaternion, Vector3};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Gyroscope-backed orientation.
///
/// Activation only turns the attitude stream on and resolves the platform
/// profile. The display rotation is advanced by [`tick`](Self::tick), which
/// the host calls once per frame and which works as soon as the stream is
/// enabled, even while activation is still waiting on focus.
pub struct OrientationSensor {
    base: SensorBase,
    attitude: Rc<dyn AttitudeService>,
    probe: Rc<dyn PlatformProbe>,
    fusion: RefCell<OrientationFusion>,
}

impl OrientationSensor {
    pub fn new(
        attitude: Rc<dyn AttitudeService>,
        probe: Rc<dyn PlatformProbe>,
        focus: FocusGate,
        poll_interval: Duration,
        sink: Rc<dyn StatusSink>,
        config: FusionConfig,
    ) -> Self {
        OrientationSensor {
            base: SensorBase::new("orientation", focus, poll_interval, sink),
            attitude,
            probe,
            fusion: RefCell::new(OrientationFusion::new(config.smoothing)),
        }
    }

    /// One fusion step. No-op while the attitude stream is disabled.
    pub fn tick(&self) {
        self.advance(None);
    }

    /// One fusion step with the elapsed frame time
    pub fn tick_with_delta(&self, dt: Duration) {
        self.advance(Some(dt));
    }

    fn advance(&self, dt: Option<Duration>) {
        if !self.attitude.is_enabled() {
            return;
        }
        let raw = self.attitude.attitude();
        self.fusion.borrow_mut().step(&raw, dt);
    }

    /// Rotation currently applied to the camera
    pub fn display_rotation(&self) -> UnitQuaternion<f64> {
        self.fusion.borrow().rotation()
    }

    pub fn set_display_rotation(&self, rotation: UnitQuaternion<f64>) {
        self.fusion.borrow_mut().set_rotation(rotation);
    }

    /// Display rotation as (roll, pitch, yaw) in degrees
    pub fn euler_angles(&self) -> Vector3<f64> {
        let (roll, pitch, yaw) = self.display_rotation().euler_angles();
        Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
    }

    pub fn profile(&self) -> PlatformProfile {
        self.fusion.borrow().profile()
    }
}

#[async_trait(?Send)]
impl SensorLifecycle for OrientationSensor {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn state(&self) -> SensorState {
        self.base.get_state()
    }

    async fn activate(&self) -> ActivationOutcome {
        let ticket = match self.base.begin_activation().await {
            Ok(ticket) => ticket,
            Err(outcome) => return outcome,
        };
        self.base.post("Orientation activation started");

        // enabling the stream raises the OS prompt on first use
        self.base.set_state(SensorState::AwaitingPermission);
        self.attitude.set_enabled(true);

        self.base.set_state(SensorState::AwaitingFocus);
        if let Err(reason) = self.base.wait_for_focus(ticket).await {
            return self.base.interrupted(reason);
        }
        if let Err(reason) = self
            .base
            .wait_until(ticket, || self.attitude.is_enabled())
            .await
        {
            return self.base.interrupted(reason);
        }

        let profile = PlatformProfile::resolve(self.probe.as_ref());
        tracing::debug!(
            android_like = profile.horizontal_offset_deg != 0.0,
            horizontal_offset_deg = profile.horizontal_offset_deg,
            "platform profile resolved"
        );
        self.fusion.borrow_mut().set_profile(profile);

        let outcome = self.base.mark_running();
        self.base.post("Orientation activation finished");
        outcome
    }

    fn stop(&self) {
        self.base.mark_stopped();
        self.attitude.set_enabled(false);
    }

    fn destroy(&self) {
        self.base.destroy();
    }
}
