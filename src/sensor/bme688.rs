//! BME688 over the Raspberry Pi I2C bus.
//!
//! Register decoding and compensation live in the `bme680` driver (the BME688
//! is register compatible for forced-mode measurements). This module owns bus
//! setup, the measurement profile, and moving the blocking transaction off
//! the async runtime.

use crate::error::{CollectorError, Result};
use crate::sensor::{
    config::{SensorConfig, PRIMARY_ADDRESS},
    data::Reading,
    traits::Sensor,
};
use async_trait::async_trait;
use bme680::{
    Bme680, FieldDataCondition, I2CAddress, IIRFilterSize, OversamplingSetting, PowerMode,
    SettingsBuilder,
};
use rppal::hal::Delay;
use rppal::i2c::{self, I2c};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gas heater target temperature in degrees Celsius.
const HEATER_TEMP_C: u16 = 320;
/// Gas heater on-time.
const HEATER_DURATION: Duration = Duration::from_millis(150);
/// Ambient temperature assumed for heater resistance calculation.
const AMBIENT_TEMP_C: i8 = 25;

struct Device {
    driver: Bme680<I2c, Delay>,
    delay: Delay,
    profile: Duration,
}

impl Device {
    fn measure(&mut self) -> Result<Reading> {
        self.driver
            .set_sensor_mode(&mut self.delay, PowerMode::ForcedMode)
            .map_err(|e| CollectorError::sensor_read_error(format!("set forced mode: {:?}", e)))?;

        std::thread::sleep(self.profile);

        let (data, condition) = self
            .driver
            .get_sensor_data(&mut self.delay)
            .map_err(|e| CollectorError::sensor_read_error(format!("fetch data: {:?}", e)))?;

        if let FieldDataCondition::Unchanged = condition {
            return Err(CollectorError::sensor_read_error(
                "sensor reported no new data",
            ));
        }

        Ok(Reading::new(
            f64::from(data.temperature_celsius()),
            f64::from(data.humidity_percent()),
            f64::from(data.pressure_hpa()),
            f64::from(data.gas_resistance_ohm()),
        ))
    }
}

/// BME688 sensor attached to a Linux I2C bus.
pub struct Bme688Sensor {
    device: Arc<Mutex<Device>>,
    name: String,
}

impl Bme688Sensor {
    /// Open the I2C bus and initialize the sensor.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        config.validate()?;

        let i2c = I2c::with_bus(config.i2c_bus).map_err(|e| match e {
            i2c::Error::Io(err) => CollectorError::Io(err),
            other => CollectorError::sensor_read_error(format!(
                "Failed to open I2C bus {}: {}",
                config.i2c_bus, other
            )),
        })?;

        let address = if config.address == PRIMARY_ADDRESS {
            I2CAddress::Primary
        } else {
            I2CAddress::Secondary
        };

        let mut delay = Delay::new();
        let mut driver = Bme680::init(i2c, &mut delay, address).map_err(|e| {
            CollectorError::sensor_read_error(format!(
                "BME688 not found at {:#04x}: {:?}",
                config.address, e
            ))
        })?;

        let settings = SettingsBuilder::new()
            .with_humidity_oversampling(OversamplingSetting::OS2x)
            .with_pressure_oversampling(OversamplingSetting::OS4x)
            .with_temperature_oversampling(OversamplingSetting::OS8x)
            .with_temperature_filter(IIRFilterSize::Size3)
            .with_gas_measurement(HEATER_DURATION, HEATER_TEMP_C, AMBIENT_TEMP_C)
            .with_run_gas(true)
            .build();

        let profile = driver
            .get_profile_dur(&settings.0)
            .map_err(|e| CollectorError::sensor_read_error(format!("profile duration: {:?}", e)))?;

        driver
            .set_sensor_settings(&mut delay, settings)
            .map_err(|e| CollectorError::sensor_read_error(format!("apply settings: {:?}", e)))?;

        tracing::info!(
            "BME688 initialized on /dev/i2c-{} at {:#04x} (profile {:?})",
            config.i2c_bus,
            config.address,
            profile
        );

        Ok(Self {
            device: Arc::new(Mutex::new(Device {
                driver,
                delay,
                profile,
            })),
            name: format!("bme688@i2c-{}:{:#04x}", config.i2c_bus, config.address),
        })
    }
}

#[async_trait]
impl Sensor for Bme688Sensor {
    async fn read(&mut self) -> Result<Reading> {
        let device = Arc::clone(&self.device);
        tokio::task::spawn_blocking(move || {
            let mut device = device
                .lock()
                .map_err(|_| CollectorError::sensor_read_error("sensor lock poisoned"))?;
            device.measure()
        })
        .await
        .map_err(|e| CollectorError::sensor_read_error(format!("read task failed: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
