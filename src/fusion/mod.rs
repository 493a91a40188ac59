//! Orientation fusion
//!
//! Turns the raw attitude reported by the platform into the rotation applied
//! to the camera-facing object:
//!
//! 1. convert the right-handed attitude into the scene's left-handed frame
//! 2. tilt by the vertical offset about the local left axis
//! 3. turn by the horizontal offset about the local up axis
//! 4. slerp the display rotation toward the result
//!
//! This is not a filter. There is no state beyond the current
//! display rotation.

use crate::config::SmoothingMode;
use crate::platform::PlatformProbe;
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use std::time::Duration;

/// Below this norm the platform has not produced an attitude yet
const MIN_ATTITUDE_NORM: f64 = 1.0e-6;
const SLERP_EPSILON: f64 = 1.0e-9;

/// Corrections that depend on the platform the rig runs on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformProfile {
    pub vertical_offset_deg: f64,
    pub horizontal_offset_deg: f64,
    pub smoothing_factor: f64,
}

impl PlatformProfile {
    pub const VERTICAL_OFFSET_DEG: f64 = -90.0;
    pub const ANDROID_HORIZONTAL_OFFSET_DEG: f64 = -90.0;
    pub const SMOOTHING_FACTOR: f64 = 0.2;

    pub fn for_platform(android_like: bool) -> Self {
        PlatformProfile {
            vertical_offset_deg: Self::VERTICAL_OFFSET_DEG,
            horizontal_offset_deg: if android_like {
                Self::ANDROID_HORIZONTAL_OFFSET_DEG
            } else {
                0.0
            },
            smoothing_factor: Self::SMOOTHING_FACTOR,
        }
    }

    /// Ask the probe now. The answer is not cached between activations.
    pub fn resolve(probe: &dyn PlatformProbe) -> Self {
        Self::for_platform(probe.is_android_like())
    }

    pub fn vertical_correction(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&left_axis(), self.vertical_offset_deg.to_radians())
    }

    pub fn horizontal_correction(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.horizontal_offset_deg.to_radians())
    }
}

impl Default for PlatformProfile {
    fn default() -> Self {
        Self::for_platform(false)
    }
}

fn left_axis() -> Unit<Vector3<f64>> {
    Unit::new_unchecked(-Vector3::x())
}

/// Right-handed sensor frame to left-handed scene frame: `(x, y, z, w) -> (x, y, -z, -w)`
pub fn to_left_handed(q: &Quaternion<f64>) -> Quaternion<f64> {
    Quaternion::new(-q.w, q.i, q.j, -q.k)
}

/// Per-tick smoothing state for one orientation sensor
#[derive(Debug, Clone)]
pub struct OrientationFusion {
    profile: PlatformProfile,
    smoothing: SmoothingMode,
    rotation: UnitQuaternion<f64>,
}

impl OrientationFusion {
    pub fn new(smoothing: SmoothingMode) -> Self {
        OrientationFusion {
            profile: PlatformProfile::default(),
            smoothing,
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn profile(&self) -> PlatformProfile {
        self.profile
    }

    pub fn set_profile(&mut self, profile: PlatformProfile) {
        self.profile = profile;
    }

    /// The current display rotation
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f64>) {
        self.rotation = rotation;
    }

    /// Corrected orientation for a raw attitude, before smoothing
    pub fn target(&self, raw: &Quaternion<f64>) -> Option<UnitQuaternion<f64>> {
        let attitude = UnitQuaternion::try_new(to_left_handed(raw), MIN_ATTITUDE_NORM)?;
        Some(self.profile.horizontal_correction() * self.profile.vertical_correction() * attitude)
    }

    /// Interpolation factor for one tick.
    ///
    /// `PerTick` ignores `dt`, so convergence speed follows the frame rate.
    pub fn interpolation_factor(&self, dt: Option<Duration>) -> f64 {
        let factor = self.profile.smoothing_factor;
        match (self.smoothing, dt) {
            (SmoothingMode::TimeNormalized { reference_hz }, Some(dt)) => {
                let frames = dt.as_secs_f64() * reference_hz;
                1.0 - (1.0 - factor).powf(frames)
            }
            _ => factor,
        }
    }

    /// Advance the display rotation one tick toward the raw attitude
    pub fn step(&mut self, raw: &Quaternion<f64>, dt: Option<Duration>) -> UnitQuaternion<f64> {
        let Some(target) = self.target(raw) else {
            tracing::trace!("attitude not available yet, fusion step skipped");
            return self.rotation;
        };

        let t = self.interpolation_factor(dt);
        self.rotation = self
            .rotation
            .try_slerp(&target, t, SLERP_EPSILON)
            .unwrap_or(target);
        self.rotation
    }
}

impl Default for OrientationFusion {
    fn default() -> Self {
        Self::new(SmoothingMode::PerTick)
    }
}
