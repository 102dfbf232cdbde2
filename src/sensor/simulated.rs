//! Simulated BME688 for hosts without the sensor attached.

use crate::error::Result;
use crate::sensor::{config::SensorConfig, data::Reading, traits::Sensor};
use async_trait::async_trait;

/// Produces plausible indoor readings with a slow deterministic drift.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSensor {
    samples: u64,
}

impl SimulatedSensor {
    /// Create a simulated sensor; the configuration is accepted for parity
    /// with the hardware sensor and otherwise ignored.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Using simulated BME688 (bus {}, address {:#04x} ignored)",
            config.i2c_bus,
            config.address
        );
        Ok(Self::default())
    }

    fn sample(&self) -> Reading {
        let phase = self.samples as f64 * 0.1;
        Reading::new(
            22.5 + 0.8 * phase.sin(),
            45.0 + 3.0 * (phase * 0.7).cos(),
            1013.2 + 1.5 * (phase * 0.3).sin(),
            50_000.0 + 5_000.0 * (phase * 0.5).cos(),
        )
    }
}

#[async_trait]
impl Sensor for SimulatedSensor {
    async fn read(&mut self) -> Result<Reading> {
        let reading = self.sample();
        self.samples = self.samples.wrapping_add(1);
        Ok(reading)
    }

    fn name(&self) -> &str {
        "simulated-bme688"
    }
}
