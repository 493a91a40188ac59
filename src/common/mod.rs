//! Common utilities and types for the sensor rig

/// Common types and utilities used across the codebase
pub mod types {
    use nalgebra::Vector3;

    /// A geographic fix (latitude, longitude in degrees, altitude in meters)
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct GeoReading {
        pub latitude: f64,
        pub longitude: f64,
        pub altitude: f64,
    }

    impl GeoReading {
        pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
            GeoReading {
                latitude,
                longitude,
                altitude,
            }
        }

        /// The fallback returned when the location service is not running
        pub fn zero() -> Self {
            Self::default()
        }

        /// The reading as a `(latitude, longitude, altitude)` vector
        pub fn as_vector(&self) -> Vector3<f64> {
            Vector3::new(self.latitude, self.longitude, self.altitude)
        }
    }

    impl From<GeoReading> for Vector3<f64> {
        fn from(reading: GeoReading) -> Self {
            reading.as_vector()
        }
    }
}

/// Compass helpers
pub mod heading {
    /// Converts a raw true heading into the rig's heading convention.
    ///
    /// The platform compass turns the opposite way to the scene, so the
    /// heading is mirrored (`360 - raw`) and wrapped into `[0, 360)`.
    pub fn from_true_heading(raw_true_heading: f32) -> f32 {
        let heading = (360.0 - raw_true_heading).rem_euclid(360.0);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs
        if heading >= 360.0 {
            0.0
        } else {
            heading
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use approx::assert_relative_eq;

        #[test]
        fn mirrors_raw_heading() {
            assert_relative_eq!(from_true_heading(90.0), 270.0);
            assert_relative_eq!(from_true_heading(270.0), 90.0);
            assert_relative_eq!(from_true_heading(359.5), 0.5, epsilon = 1e-4);
        }

        #[test]
        fn north_stays_in_range() {
            assert_eq!(from_true_heading(0.0), 0.0);
        }

        #[test]
        fn every_whole_degree_lands_in_range() {
            for raw in 0..360 {
                let heading = from_true_heading(raw as f32);
                assert!((0.0..360.0).contains(&heading), "raw {raw} -> {heading}");
                if raw != 0 {
                    assert_relative_eq!(heading, 360.0 - raw as f32);
                }
            }
        }
    }
}
