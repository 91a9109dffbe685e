//! Raw sensor readings fed into the tracker.

use chrono::{DateTime, Utc};
use model::location::Location;
use serde::{Deserialize, Serialize};

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.80665;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorSample {
    /// Accelerometer reading in m/s², gravity included.
    Acceleration { x: f64, y: f64, z: f64 },
    Gps(GpsFix),
}

impl SensorSample {
    pub fn acceleration(x: f64, y: f64, z: f64) -> Self {
        Self::Acceleration { x, y, z }
    }

    pub fn gps(latitude: f64, longitude: f64, speed: Option<f64>) -> Self {
        Self::Gps(GpsFix {
            latitude,
            longitude,
            speed,
            time: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Speed in m/s as reported by the receiver, if any.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Time of the fix. Defaults to the time it was received.
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl GpsFix {
    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude)
    }
}

/// How far the magnitude of an accelerometer reading is from gravity.
pub fn gravity_deviation(x: f64, y: f64, z: f64) -> f64 {
    ((x * x + y * y + z * z).sqrt() - GRAVITY).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_device_only_feels_gravity() {
        assert!(gravity_deviation(0.0, 0.0, GRAVITY) < 1e-9);
        assert!((gravity_deviation(3.0, 4.0, 0.0) - (GRAVITY - 5.0)).abs() < 1e-9);
    }

    #[test]
    fn samples_are_tagged_json() {
        let sample: SensorSample = serde_json::from_str(
            r#"{"type":"gps","latitude":54.32,"longitude":10.13,"speed":2.5}"#,
        )
        .unwrap();
        assert_eq!(sample, SensorSample::gps(54.32, 10.13, Some(2.5)));

        let sample: SensorSample =
            serde_json::from_str(r#"{"type":"acceleration","x":0.1,"y":0.0,"z":9.8}"#).unwrap();
        assert_eq!(sample, SensorSample::acceleration(0.1, 0.0, 9.8));
    }
}
