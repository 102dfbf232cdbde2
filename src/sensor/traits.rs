//! Trait for environmental sensors.

use crate::error::Result;
use crate::sensor::data::Reading;
use async_trait::async_trait;

/// A source of environmental readings.
///
/// Implementations perform one complete measurement per call. Transient bus
/// faults are reported as [`CollectorError::SensorRead`](crate::CollectorError::SensorRead)
/// and must leave the sensor usable for the next call.
#[async_trait]
pub trait Sensor: Send {
    /// Take one measurement.
    async fn read(&mut self) -> Result<Reading>;

    /// Short human-readable name used in log lines.
    fn name(&self) -> &str;
}
