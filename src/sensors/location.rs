//! Geolocation and compass sensor

use crate::common::heading;
use crate::common::types::GeoReading;
use crate::config::{self, LocationConfig};
use crate::error::{Result, SensorError};
use crate::lifecycle::{ActivationOutcome, FocusGate, SensorBase, SensorLifecycle, SensorState};
use crate::platform::{CompassService, LocationService, LocationStatus};
use crate::status::StatusSink;
use async_trait::async_trait;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Position fixes plus compass heading.
///
/// Readings are pulled from the platform on demand; nothing is cached here.
pub struct LocationSensor {
    base: SensorBase,
    location: Rc<dyn LocationService>,
    compass: Rc<dyn CompassService>,
    config: LocationConfig,
}

impl LocationSensor {
    pub fn new(
        location: Rc<dyn LocationService>,
        compass: Rc<dyn CompassService>,
        focus: FocusGate,
        poll_interval: Duration,
        sink: Rc<dyn StatusSink>,
        config: LocationConfig,
    ) -> Self {
        LocationSensor {
            base: SensorBase::new("location", focus, poll_interval, sink),
            location,
            compass,
            config,
        }
    }

    /// Configure accuracy and update distance. Takes effect on the next activation.
    pub fn configure(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        config::apply_location(&mut self.config, params)
    }

    pub fn config(&self) -> &LocationConfig {
        &self.config
    }

    /// True once the platform reports the location service as running
    pub fn is_running(&self) -> bool {
        self.location.status() == LocationStatus::Running
    }

    /// Latest fix, or an error when the service is not running
    pub fn try_current_location(&self) -> Result<GeoReading> {
        if !self.is_running() {
            return Err(SensorError::InactiveSensorQuery(format!(
                "location service is {:?}",
                self.location.status()
            )));
        }
        Ok(self.location.last_fix())
    }

    /// Latest fix. Logs an error and returns the zero reading when the
    /// service is not running, so check [`is_running`](Self::is_running) first.
    pub fn current_location(&self) -> GeoReading {
        self.try_current_location().unwrap_or_else(|err| {
            tracing::error!(%err, "start the location sensor before reading it");
            GeoReading::zero()
        })
    }

    /// Heading in degrees `[0, 360)`, mirrored from the compass.
    ///
    /// Reflects whatever the compass last reported, running or not.
    pub fn current_heading(&self) -> f32 {
        heading::from_true_heading(self.compass.true_heading())
    }

    fn release(&self) {
        self.compass.set_enabled(false);
        self.location.stop();
    }
}

#[async_trait(?Send)]
impl SensorLifecycle for LocationSensor {
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
        self.base.post("Location activation started");

        // starting the service is what raises the OS prompt
        self.base.set_state(SensorState::AwaitingPermission);
        self.compass.set_enabled(true);
        self.location.start(
            self.config.desired_accuracy_m,
            self.config.min_update_distance_m,
        );

        self.base.set_state(SensorState::AwaitingFocus);
        if let Err(reason) = self.base.wait_for_focus(ticket).await {
            return self.base.interrupted(reason);
        }

        let settled = self.base.wait_until(ticket, || {
            matches!(
                self.location.status(),
                LocationStatus::Running | LocationStatus::Failed
            )
        });
        if let Err(reason) = settled.await {
            return self.base.interrupted(reason);
        }

        let outcome = if self.is_running() {
            self.base.mark_running()
        } else {
            self.release();
            self.base.degrade(SensorError::ServiceUnavailable(
                "location service failed to start".to_string(),
            ))
        };
        self.base.post("Location activation finished");
        outcome
    }

    fn stop(&self) {
        self.base.mark_stopped();
        self.release();
    }

    fn destroy(&self) {
        self.base.destroy();
    }
}
