//! # Air of Pi - BME688 Environmental Telemetry
//!
//! A small collector for Raspberry Pi class boards: read temperature,
//! humidity, pressure and gas resistance from a BME688 over I2C and write
//! them to InfluxDB at a fixed cadence for display on a Grafana dashboard.
//!
//! ## Features
//!
//! - **Sensor polling**: BME688 forced-mode measurements over I2C (feature-gated)
//! - **Simulated sensor**: plausible readings on machines without the hardware
//! - **InfluxDB v2 writes**: line protocol over HTTP with bounded timeouts
//! - **Log and continue**: a failed read or write skips the tick, never the loop
//! - **Dashboard**: a ready-to-import Grafana dashboard for the same fields
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use air_of_pi::{Collector, CollectorConfig, DefaultSensor, InfluxStore, SensorConfig, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sensor = DefaultSensor::open(&SensorConfig::default())?;
//!     let store = InfluxStore::new(StoreConfig::new(
//!         "http://localhost:8086",
//!         "my-token",
//!         "home",
//!         "sensors",
//!     ))?;
//!
//!     let mut collector = Collector::new(sensor, store, CollectorConfig::default())?;
//!     collector.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```

pub mod collector;
pub mod dashboard;
pub mod error;
pub mod sensor;
pub mod store;

// Re-export public API
pub use collector::{Collector, CollectorConfig, CollectorStats, TickOutcome};
pub use error::{CollectorError, Result};
pub use sensor::{DefaultSensor, Reading, Sensor, SensorConfig, SimulatedSensor};
pub use store::{HealthStatus, InfluxStore, Point, Store, StoreConfig};

#[cfg(feature = "hardware")]
pub use sensor::bme688::Bme688Sensor;

/// The default collection interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// The default bound on one sensor read in seconds
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;

/// The default bound on one store write in seconds
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// The default measurement name
pub const DEFAULT_MEASUREMENT: &str = "environment";

/// The default I2C bus (`/dev/i2c-1` on Raspberry Pi)
pub const DEFAULT_I2C_BUS: u8 = 1;

/// Consecutive failed ticks before the loop logs an error
pub const DEFAULT_FAILURE_ALERT_THRESHOLD: u32 = 5;
