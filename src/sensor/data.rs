//! Data structures for sensor readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gas resistance in ohms that maps to one step of the VOC estimate.
const VOC_OHMS_PER_STEP: f64 = 50_000.0;

/// One point-in-time sample from the environmental sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Capture time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
    /// Barometric pressure in hectopascals
    pub pressure: f64,
    /// Heated gas plate resistance in ohms
    pub gas_resistance: f64,
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(temperature: f64, humidity: f64, pressure: f64, gas_resistance: f64) -> Self {
        Self::with_timestamp(Utc::now(), temperature, humidity, pressure, gas_resistance)
    }

    /// Create a reading with an explicit capture time.
    pub fn with_timestamp(
        timestamp: DateTime<Utc>,
        temperature: f64,
        humidity: f64,
        pressure: f64,
        gas_resistance: f64,
    ) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
            pressure,
            gas_resistance,
        }
    }

    /// Rough air quality estimate on a 1.0 to 5.0 scale.
    ///
    /// Higher gas resistance means fewer reducing VOCs in the air. This is a
    /// linear approximation, not the vendor's calibrated IAQ index.
    pub fn voc_estimate(&self) -> f64 {
        (self.gas_resistance / VOC_OHMS_PER_STEP).clamp(1.0, 5.0)
    }

    /// The four measured values as `(field name, value)` pairs.
    pub fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("pressure", self.pressure),
            ("gas_resistance", self.gas_resistance),
        ]
    }
}
