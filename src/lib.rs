pub mod common;
pub mod config;
pub mod error;
pub mod fusion;
pub mod lifecycle;
pub mod orchestrator;
pub mod platform;
pub mod sensors;
pub mod status;

use crate::config::RigConfig;
use crate::lifecycle::{FocusState, SensorLifecycle};
use crate::orchestrator::{Orchestrator, ReadinessReport};
use crate::platform::PlatformServices;
use crate::sensors::{CaptureSensor, LocationSensor, OrientationSensor};
use crate::status::StatusSink;
use std::rc::Rc;
use std::time::Duration;

pub use crate::error::{Result, SensorError};

/// The three sensors an AR session needs, plus the focus flag they share
pub struct SensorRig {
    focus: FocusState,
    capture: CaptureSensor,
    location: LocationSensor,
    orientation: OrientationSensor,
    sink: Rc<dyn StatusSink>,
}

impl SensorRig {
    /// Create a new rig on top of the given platform
    pub fn new(services: &PlatformServices, config: &RigConfig, sink: Rc<dyn StatusSink>) -> Self {
        let focus = FocusState::new(config.focus.initial_focus);
        let gate = focus.gate(config.focus.settle_delay);
        let poll = config.focus.poll_interval;

        SensorRig {
            capture: CaptureSensor::new(
                services.authorization.clone(),
                services.capture.clone(),
                gate.clone(),
                poll,
                sink.clone(),
                config.capture.clone(),
            ),
            location: LocationSensor::new(
                services.location.clone(),
                services.compass.clone(),
                gate.clone(),
                poll,
                sink.clone(),
                config.location.clone(),
            ),
            orientation: OrientationSensor::new(
                services.attitude.clone(),
                services.probe.clone(),
                gate,
                poll,
                sink.clone(),
                config.fusion.clone(),
            ),
            focus,
            sink,
        }
    }

    pub fn capture(&self) -> &CaptureSensor {
        &self.capture
    }

    pub fn location(&self) -> &LocationSensor {
        &self.location
    }

    /// Mutable access for reconfiguration before activation
    pub fn location_mut(&mut self) -> &mut LocationSensor {
        &mut self.location
    }

    pub fn orientation(&self) -> &OrientationSensor {
        &self.orientation
    }

    /// Host focus-change notification
    pub fn on_focus_changed(&self, has_focus: bool) {
        tracing::debug!(has_focus, "application focus changed");
        self.focus.set(has_focus);
    }

    pub fn has_focus(&self) -> bool {
        self.focus.has_focus()
    }

    /// An orchestrator over this rig's sensors
    pub fn orchestrator(&self) -> Orchestrator<'_> {
        let mut orchestrator = Orchestrator::new(self.sink.clone());
        orchestrator.register(&self.capture);
        orchestrator.register(&self.location);
        orchestrator.register(&self.orientation);
        orchestrator
    }

    /// Activate all sensors and wait until each has finished
    pub async fn start(&self) -> ReadinessReport {
        self.orchestrator().start().await
    }

    /// Per-frame update from the host scheduler
    pub fn tick(&self) {
        self.orientation.tick();
    }

    pub fn tick_with_delta(&self, dt: Duration) {
        self.orientation.tick_with_delta(dt);
    }

    /// Stop every sensor and release platform resources
    pub fn shutdown(&self) {
        self.capture.stop();
        self.location.stop();
        self.orientation.stop();
    }

    /// Cancel every in-flight activation
    pub fn destroy(&self) {
        self.capture.destroy();
        self.location.destroy();
        self.orientation.destroy();
    }
}
