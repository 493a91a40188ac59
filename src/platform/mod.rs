//! Platform collaborator interfaces
//!
//! Everything the sensors need from the host OS is expressed as a narrow
//! trait here. Implementations are shared as `Rc<dyn Trait>` because the
//! whole rig runs on a single cooperative thread.

pub mod probe;
pub mod simulated;

use crate::common::types::GeoReading;
use crate::error::Result;
use async_trait::async_trait;
use nalgebra::Quaternion;
use std::rc::Rc;

pub use self::probe::{FixedProbe, NativeProbe, PlatformProbe};
pub use self::simulated::SimulatedPlatform;

/// A capability guarded by an OS permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Capture,
    Location,
    Orientation,
}

/// Authorization state for one capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationState {
    #[default]
    Unknown,
    Denied,
    Granted,
}

impl AuthorizationState {
    pub fn is_granted(self) -> bool {
        self == AuthorizationState::Granted
    }
}

/// Host-mediated permission checks
#[async_trait(?Send)]
pub trait AuthorizationService {
    /// Current authorization without prompting
    fn query(&self, capability: Capability) -> AuthorizationState;

    /// Show the OS prompt and wait for the user to answer
    async fn request(&self, capability: Capability) -> AuthorizationState;
}

/// What kind of lens a capture device has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    WideAngle,
    Telephoto,
    UltraWide,
    ColorAndDepth,
    Unknown,
}

/// An entry returned by capture device enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureDevice {
    pub name: String,
    pub is_front_facing: bool,
    pub kind: DeviceKind,
}

impl CaptureDevice {
    pub fn new(name: &str, is_front_facing: bool, kind: DeviceKind) -> Self {
        CaptureDevice {
            name: name.to_string(),
            is_front_facing,
            kind,
        }
    }
}

/// An open capture stream. Closing goes through the owning service.
#[derive(Debug, PartialEq, Eq)]
pub struct StreamHandle {
    pub id: u64,
    pub device_name: String,
}

/// Camera enumeration and streaming
pub trait CaptureDeviceService {
    /// Devices in platform order
    fn enumerate(&self) -> Vec<CaptureDevice>;

    /// Open and start a stream on the named device
    fn open_stream(&self, device_name: &str) -> Result<StreamHandle>;

    /// Release a stream previously returned by `open_stream`
    fn close_stream(&self, handle: StreamHandle);
}

/// Status reported by the location service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Failed,
}

/// Satellite/network positioning
pub trait LocationService {
    fn start(&self, desired_accuracy_m: f64, min_update_distance_m: f64);
    fn stop(&self);
    fn status(&self) -> LocationStatus;
    fn last_fix(&self) -> GeoReading;
}

/// Magnetic compass
pub trait CompassService {
    fn set_enabled(&self, enabled: bool);

    /// Heading relative to geographic north, degrees in `[0, 360)`
    fn true_heading(&self) -> f32;
}

/// Device attitude (gyroscope fused by the OS)
pub trait AttitudeService {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;

    /// Latest attitude in the sensor's native right-handed frame
    fn attitude(&self) -> Quaternion<f64>;
}

/// The full set of collaborators a rig is built from
#[derive(Clone)]
pub struct PlatformServices {
    pub authorization: Rc<dyn AuthorizationService>,
    pub capture: Rc<dyn CaptureDeviceService>,
    pub location: Rc<dyn LocationService>,
    pub compass: Rc<dyn CompassService>,
    pub attitude: Rc<dyn AttitudeService>,
    pub probe: Rc<dyn PlatformProbe>,
}

impl PlatformServices {
    /// Wire every collaborator to the same simulated platform
    pub fn simulated(platform: &Rc<SimulatedPlatform>) -> Self {
        PlatformServices {
            authorization: platform.clone(),
            capture: platform.clone(),
            location: platform.clone(),
            compass: platform.clone(),
            attitude: platform.clone(),
            probe: platform.clone(),
        }
    }
}
