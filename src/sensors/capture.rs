//! Camera capture sensor

use crate::config::{CaptureConfig, DeviceSelection};
use crate::error::SensorError;
use crate::lifecycle::{ActivationOutcome, FocusGate, SensorBase, SensorLifecycle, SensorState};
use crate::platform::{
    AuthorizationService, Capability, CaptureDevice, CaptureDeviceService, StreamHandle,
};
use crate::status::StatusSink;
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Rear camera feed behind the AR scene
pub struct CaptureSensor {
    base: SensorBase,
    authorization: Rc<dyn AuthorizationService>,
    devices: Rc<dyn CaptureDeviceService>,
    config: CaptureConfig,
    stream: RefCell<Option<StreamHandle>>,
}

impl CaptureSensor {
    pub fn new(
        authorization: Rc<dyn AuthorizationService>,
        devices: Rc<dyn CaptureDeviceService>,
        focus: FocusGate,
        poll_interval: Duration,
        sink: Rc<dyn StatusSink>,
        config: CaptureConfig,
    ) -> Self {
        CaptureSensor {
            base: SensorBase::new("capture", focus, poll_interval, sink),
            authorization,
            devices,
            config,
            stream: RefCell::new(None),
        }
    }

    fn is_authorized(&self) -> bool {
        self.authorization.query(Capability::Capture).is_granted()
    }

    /// Name of the device with an open stream
    pub fn active_device(&self) -> Option<String> {
        self.stream
            .borrow()
            .as_ref()
            .map(|handle| handle.device_name.clone())
    }

    /// Enumerate, pick a device and start streaming from it
    fn start_device(&self) -> ActivationOutcome {
        let devices = self.devices.enumerate();
        tracing::debug!(count = devices.len(), "capture devices found");
        for (index, device) in devices.iter().enumerate() {
            tracing::debug!(
                index,
                name = %device.name,
                front_facing = device.is_front_facing,
                kind = ?device.kind,
                "capture device"
            );
        }

        let Some(device) = select_device(&devices, self.config.selection) else {
            return self
                .base
                .degrade(SensorError::DeviceUnavailable("no capture devices".to_string()));
        };

        match self.devices.open_stream(&device.name) {
            Ok(handle) => {
                tracing::info!(device = %handle.device_name, "capture stream started");
                self.release_stream();
                *self.stream.borrow_mut() = Some(handle);
                self.base.mark_running()
            }
            Err(err) => self.base.degrade(err),
        }
    }

    fn release_stream(&self) {
        if let Some(handle) = self.stream.borrow_mut().take() {
            self.devices.close_stream(handle);
        }
    }
}

/// Resolve the configured selection against the enumeration.
///
/// `Index` is positional and clamps to the last device when the list is
/// shorter than expected.
pub fn select_device(
    devices: &[CaptureDevice],
    selection: DeviceSelection,
) -> Option<&CaptureDevice> {
    match selection {
        DeviceSelection::Index(index) => devices.get(index).or_else(|| devices.last()),
        DeviceSelection::RearFacing => devices
            .iter()
            .find(|device| !device.is_front_facing)
            .or_else(|| devices.first()),
    }
}

#[async_trait(?Send)]
impl SensorLifecycle for CaptureSensor {
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
        self.base.post("Capture activation started");

        if !self.is_authorized() {
            self.base.set_state(SensorState::AwaitingPermission);
            let request = self.authorization.request(Capability::Capture);
            if let Err(reason) = self.base.suspend(ticket, request).await {
                return self.base.interrupted(reason);
            }

            // the permission dialog does not hand focus straight back
            self.base.set_state(SensorState::AwaitingFocus);
            if let Err(reason) = self.base.wait_for_focus(ticket).await {
                return self.base.interrupted(reason);
            }

            if !self.is_authorized() {
                let outcome = self
                    .base
                    .degrade(SensorError::PermissionDenied(Capability::Capture));
                self.base.post("Capture activation finished");
                return outcome;
            }
        }

        let outcome = self.start_device();
        self.base.post("Capture activation finished");
        outcome
    }

    fn stop(&self) {
        self.base.mark_stopped();
        self.release_stream();
    }

    fn destroy(&self) {
        self.base.destroy();
    }
}
