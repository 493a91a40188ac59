//! Concrete sensors

pub mod capture;
pub mod location;
pub mod orientation;

pub use self::capture::CaptureSensor;
pub use self::location::LocationSensor;
pub use self::orientation::OrientationSensor;
