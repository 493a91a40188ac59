//! Rig configuration
//!
//! Every section has a `Default` matching the shipped behaviour. A flat
//! `HashMap<String, f64>` of overrides can be applied on top, the same way
//! the other components of this codebase take their parameters.

use crate::error::{Result, SensorError};
use std::collections::HashMap;
use std::time::Duration;

/// Focus gate and polling settings
#[derive(Debug, Clone, PartialEq)]
pub struct FocusConfig {
    /// Fixed delay before the focus flag is trusted
    pub settle_delay: Duration,
    /// How often wait-until predicates are re-evaluated
    pub poll_interval: Duration,
    /// Focus value assumed before the host's first notification
    pub initial_focus: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        FocusConfig {
            settle_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(16),
            initial_focus: false,
        }
    }
}

/// How the capture device is picked from the enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelection {
    /// Positional pick: 0 is front-facing, 1 is rear-facing on the phones we ship to
    Index(usize),
    /// First device that is not front-facing, falling back to the first device
    RearFacing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub selection: DeviceSelection,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            selection: DeviceSelection::Index(1),
        }
    }
}

/// Location service request.
///
/// Lower values ask the platform for a more precise, more power-hungry
/// service tier (GPS instead of network positioning).
#[derive(Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub desired_accuracy_m: f64,
    /// Minimum lateral movement before the platform publishes a new fix
    pub min_update_distance_m: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            desired_accuracy_m: 10.0,
            min_update_distance_m: 10.0,
        }
    }
}

impl LocationConfig {
    pub fn validate(&self) -> Result<()> {
        check_positive("desired_accuracy_m", self.desired_accuracy_m)?;
        check_positive("min_update_distance_m", self.min_update_distance_m)
    }
}

/// How the smoothing factor is applied each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingMode {
    /// The factor is applied once per tick regardless of frame time
    PerTick,
    /// The factor is treated as the per-frame value at `reference_hz` and
    /// rescaled by the actual frame time
    TimeNormalized { reference_hz: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    pub smoothing: SmoothingMode,
}

impl Default for FusionConfig {
    fn default() -> Self {
        FusionConfig {
            smoothing: SmoothingMode::PerTick,
        }
    }
}

/// Top-level configuration for a [`SensorRig`](crate::SensorRig)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RigConfig {
    pub focus: FocusConfig,
    pub capture: CaptureConfig,
    pub location: LocationConfig,
    pub fusion: FusionConfig,
}

impl RigConfig {
    /// Defaults with the given overrides applied
    pub fn from_params(params: &HashMap<String, f64>) -> Result<Self> {
        let mut config = RigConfig::default();
        config.apply(params)?;
        Ok(config)
    }

    /// Apply overrides. Unknown keys are ignored.
    pub fn apply(&mut self, params: &HashMap<String, f64>) -> Result<()> {
        if let Some(&ms) = params.get("settle_delay_ms") {
            self.focus.settle_delay = millis("settle_delay_ms", ms)?;
        }

        if let Some(&ms) = params.get("poll_interval_ms") {
            let interval = millis("poll_interval_ms", ms)?;
            if interval.is_zero() {
                return Err(SensorError::invalid_config("poll_interval_ms must be > 0"));
            }
            self.focus.poll_interval = interval;
        }

        if let Some(&flag) = params.get("initial_focus") {
            self.focus.initial_focus = flag != 0.0;
        }

        if let Some(&index) = params.get("camera_index") {
            if !index.is_finite() || index < 0.0 || index.fract() != 0.0 {
                return Err(SensorError::invalid_config(format!(
                    "camera_index must be a non-negative integer, got {index}"
                )));
            }
            self.capture.selection = DeviceSelection::Index(index as usize);
        }

        apply_location(&mut self.location, params)?;

        if let Some(&hz) = params.get("smoothing_reference_hz") {
            check_positive("smoothing_reference_hz", hz)?;
            self.fusion.smoothing = SmoothingMode::TimeNormalized { reference_hz: hz };
        }

        Ok(())
    }
}

/// Location overrides, also used by
/// [`LocationSensor::configure`](crate::sensors::LocationSensor::configure)
pub(crate) fn apply_location(
    location: &mut LocationConfig,
    params: &HashMap<String, f64>,
) -> Result<()> {
    let mut updated = location.clone();
    if let Some(&accuracy) = params.get("desired_accuracy_m") {
        updated.desired_accuracy_m = accuracy;
    }
    if let Some(&distance) = params.get("min_update_distance_m") {
        updated.min_update_distance_m = distance;
    }
    updated.validate()?;
    *location = updated;
    Ok(())
}

fn check_positive(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SensorError::invalid_config(format!(
            "{key} must be a positive number, got {value}"
        )))
    }
}

fn millis(key: &str, value: f64) -> Result<Duration> {
    if value.is_finite() && value >= 0.0 {
        Ok(Duration::from_secs_f64(value / 1000.0))
    } else {
        Err(SensorError::invalid_config(format!(
            "{key} must be a non-negative number of milliseconds, got {value}"
        )))
    }
}
