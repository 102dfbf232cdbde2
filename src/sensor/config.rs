//! Sensor bus configuration.

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};

/// BME68x primary I2C address (SDO pulled low).
pub const PRIMARY_ADDRESS: u8 = 0x76;

/// BME68x secondary I2C address (SDO pulled high).
pub const SECONDARY_ADDRESS: u8 = 0x77;

/// Where to find the sensor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SensorConfig {
    /// I2C bus number (`/dev/i2c-<bus>`)
    pub i2c_bus: u8,
    /// 7-bit device address
    pub address: u8,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: crate::DEFAULT_I2C_BUS,
            address: SECONDARY_ADDRESS,
        }
    }
}

impl SensorConfig {
    /// Create a sensor configuration for a bus and address.
    pub fn new(i2c_bus: u8, address: u8) -> Self {
        Self { i2c_bus, address }
    }

    /// Set the I2C bus number.
    pub fn with_bus(mut self, i2c_bus: u8) -> Self {
        self.i2c_bus = i2c_bus;
        self
    }

    /// Set the device address.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Reject addresses the BME688 cannot be strapped to.
    pub fn validate(&self) -> Result<()> {
        match self.address {
            PRIMARY_ADDRESS | SECONDARY_ADDRESS => Ok(()),
            other => Err(CollectorError::config_error(format!(
                "BME688 address must be 0x76 or 0x77, got {:#04x}",
                other
            ))),
        }
    }
}

/// Parse an address given as `0x77`, `77h` style hex or plain decimal.
pub fn parse_address(value: &str) -> std::result::Result<u8, String> {
    let value = value.trim();
    let parsed = if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u8::from_str_radix(hex, 16)
    } else if let Some(hex) = value.strip_suffix('h') {
        u8::from_str_radix(hex, 16)
    } else {
        value.parse::<u8>()
    };
    parsed.map_err(|e| format!("invalid I2C address '{}': {}", value, e))
}
