//! Error types for sensor bring-up

use crate::platform::Capability;
use thiserror::Error;

/// Reasons a sensor did not reach, or is not in, the running state.
///
/// None of these are fatal. Activation reports them through
/// [`ActivationOutcome::Degraded`](crate::lifecycle::ActivationOutcome) and
/// data queries fall back to zero values after logging them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorError {
    /// The user declined (or never granted) access to a capability.
    #[error("permission denied for {0:?}")]
    PermissionDenied(Capability),

    /// No usable device could be opened.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A platform service reported failure while starting.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A data read was issued while the sensor is not running.
    #[error("sensor is not running: {0}")]
    InactiveSensorQuery(String),

    /// A configuration value was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SensorError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SensorError>;
