//! In-memory platform for the demo host and tests
//!
//! Every knob is interior-mutable so a test can hold an `Rc` to the platform
//! and change what the sensors see while activations are suspended.

use super::{
    AttitudeService, AuthorizationService, AuthorizationState, Capability, CaptureDevice,
    CaptureDeviceService, CompassService, DeviceKind, LocationService, LocationStatus,
    PlatformProbe, StreamHandle,
};
use crate::common::types::GeoReading;
use crate::error::{Result, SensorError};
use async_trait::async_trait;
use nalgebra::Quaternion;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// A scripted stand-in for the host OS
pub struct SimulatedPlatform {
    authorization: RefCell<HashMap<Capability, AuthorizationState>>,
    prompt_answers: RefCell<HashMap<Capability, AuthorizationState>>,
    prompt_latency: Cell<Duration>,
    prompts_shown: Cell<u32>,

    devices: RefCell<Vec<CaptureDevice>>,
    open_streams: RefCell<Vec<(u64, String)>>,
    next_stream_id: Cell<u64>,

    location_started_at: Cell<Option<Instant>>,
    location_latency: Cell<Duration>,
    location_fails: Cell<bool>,
    location_request: Cell<Option<(f64, f64)>>,
    fix: Cell<GeoReading>,

    compass_enabled: Cell<bool>,
    true_heading: Cell<f32>,

    attitude_enabled: Cell<bool>,
    attitude: Cell<Quaternion<f64>>,

    android: Cell<bool>,
}

impl SimulatedPlatform {
    /// A phone with a front and a rear camera that grants every prompt
    pub fn new() -> Self {
        let answers = [
            (Capability::Capture, AuthorizationState::Granted),
            (Capability::Location, AuthorizationState::Granted),
            (Capability::Orientation, AuthorizationState::Granted),
        ];

        SimulatedPlatform {
            authorization: RefCell::new(HashMap::new()),
            prompt_answers: RefCell::new(answers.into_iter().collect()),
            prompt_latency: Cell::new(Duration::from_millis(300)),
            prompts_shown: Cell::new(0),
            devices: RefCell::new(vec![
                CaptureDevice::new("Front Camera", true, DeviceKind::WideAngle),
                CaptureDevice::new("Back Camera", false, DeviceKind::WideAngle),
            ]),
            open_streams: RefCell::new(Vec::new()),
            next_stream_id: Cell::new(1),
            location_started_at: Cell::new(None),
            location_latency: Cell::new(Duration::from_millis(500)),
            location_fails: Cell::new(false),
            location_request: Cell::new(None),
            fix: Cell::new(GeoReading::zero()),
            compass_enabled: Cell::new(false),
            true_heading: Cell::new(0.0),
            attitude_enabled: Cell::new(false),
            attitude: Cell::new(Quaternion::identity()),
            android: Cell::new(false),
        }
    }

    pub fn set_authorization(&self, capability: Capability, state: AuthorizationState) {
        self.authorization.borrow_mut().insert(capability, state);
    }

    /// What the user will answer the next time the prompt is shown
    pub fn set_prompt_answer(&self, capability: Capability, answer: AuthorizationState) {
        self.prompt_answers.borrow_mut().insert(capability, answer);
    }

    pub fn set_prompt_latency(&self, latency: Duration) {
        self.prompt_latency.set(latency);
    }

    pub fn prompts_shown(&self) -> u32 {
        self.prompts_shown.get()
    }

    pub fn set_devices(&self, devices: Vec<CaptureDevice>) {
        *self.devices.borrow_mut() = devices;
    }

    /// Device names with an open stream
    pub fn open_streams(&self) -> Vec<String> {
        self.open_streams
            .borrow()
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn set_location_latency(&self, latency: Duration) {
        self.location_latency.set(latency);
    }

    pub fn set_location_fails(&self, fails: bool) {
        self.location_fails.set(fails);
    }

    /// The accuracy and distance passed to the last `start`
    pub fn location_request(&self) -> Option<(f64, f64)> {
        self.location_request.get()
    }

    pub fn set_fix(&self, fix: GeoReading) {
        self.fix.set(fix);
    }

    pub fn compass_enabled(&self) -> bool {
        self.compass_enabled.get()
    }

    pub fn set_true_heading(&self, degrees: f32) {
        self.true_heading.set(degrees);
    }

    pub fn set_attitude(&self, attitude: Quaternion<f64>) {
        self.attitude.set(attitude);
    }

    pub fn set_android(&self, android: bool) {
        self.android.set(android);
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl AuthorizationService for SimulatedPlatform {
    fn query(&self, capability: Capability) -> AuthorizationState {
        self.authorization
            .borrow()
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }

    async fn request(&self, capability: Capability) -> AuthorizationState {
        self.prompts_shown.set(self.prompts_shown.get() + 1);
        tokio::time::sleep(self.prompt_latency.get()).await;

        let answer = self
            .prompt_answers
            .borrow()
            .get(&capability)
            .copied()
            .unwrap_or(AuthorizationState::Denied);
        self.set_authorization(capability, answer);
        answer
    }
}

impl CaptureDeviceService for SimulatedPlatform {
    fn enumerate(&self) -> Vec<CaptureDevice> {
        self.devices.borrow().clone()
    }

    fn open_stream(&self, device_name: &str) -> Result<StreamHandle> {
        if !self.devices.borrow().iter().any(|d| d.name == device_name) {
            return Err(SensorError::DeviceUnavailable(device_name.to_string()));
        }

        let id = self.next_stream_id.get();
        self.next_stream_id.set(id + 1);
        self.open_streams
            .borrow_mut()
            .push((id, device_name.to_string()));

        Ok(StreamHandle {
            id,
            device_name: device_name.to_string(),
        })
    }

    fn close_stream(&self, handle: StreamHandle) {
        self.open_streams
            .borrow_mut()
            .retain(|(id, _)| *id != handle.id);
    }
}

impl LocationService for SimulatedPlatform {
    fn start(&self, desired_accuracy_m: f64, min_update_distance_m: f64) {
        self.location_request
            .set(Some((desired_accuracy_m, min_update_distance_m)));
        if self.location_started_at.get().is_none() {
            self.location_started_at.set(Some(Instant::now()));
        }
    }

    fn stop(&self) {
        self.location_started_at.set(None);
    }

    fn status(&self) -> LocationStatus {
        match self.location_started_at.get() {
            None => LocationStatus::Stopped,
            Some(_) if self.location_fails.get() => LocationStatus::Failed,
            Some(started) if started.elapsed() >= self.location_latency.get() => {
                LocationStatus::Running
            }
            Some(_) => LocationStatus::Starting,
        }
    }

    fn last_fix(&self) -> GeoReading {
        self.fix.get()
    }
}

impl CompassService for SimulatedPlatform {
    fn set_enabled(&self, enabled: bool) {
        self.compass_enabled.set(enabled);
    }

    fn true_heading(&self) -> f32 {
        self.true_heading.get()
    }
}

impl AttitudeService for SimulatedPlatform {
    fn set_enabled(&self, enabled: bool) {
        self.attitude_enabled.set(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.attitude_enabled.get()
    }

    fn attitude(&self) -> Quaternion<f64> {
        self.attitude.get()
    }
}

impl PlatformProbe for SimulatedPlatform {
    fn is_android_like(&self) -> bool {
        self.android.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn location_reports_running_after_latency() {
        let platform = SimulatedPlatform::new();
        platform.set_location_latency(Duration::from_millis(100));
        assert_eq!(platform.status(), LocationStatus::Stopped);

        platform.start(10.0, 10.0);
        assert_eq!(platform.status(), LocationStatus::Starting);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(platform.status(), LocationStatus::Running);

        LocationService::stop(&platform);
        assert_eq!(platform.status(), LocationStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_answer_becomes_authorization() {
        let platform = SimulatedPlatform::new();
        platform.set_prompt_answer(Capability::Capture, AuthorizationState::Denied);

        assert_eq!(platform.query(Capability::Capture), AuthorizationState::Unknown);
        let answer = platform.request(Capability::Capture).await;
        assert_eq!(answer, AuthorizationState::Denied);
        assert_eq!(platform.query(Capability::Capture), AuthorizationState::Denied);
        assert_eq!(platform.prompts_shown(), 1);
    }

    #[test]
    fn streams_are_tracked_until_closed() {
        let platform = SimulatedPlatform::new();
        let handle = platform.open_stream("Back Camera").unwrap();
        assert_eq!(platform.open_streams(), vec!["Back Camera".to_string()]);

        platform.close_stream(handle);
        assert!(platform.open_streams().is_empty());
        assert!(platform.open_stream("Missing").is_err());
    }
}
