//! Environmental sensor access.
//!
//! The hardware BME688 sensor is feature-gated so the crate builds and runs
//! on development machines, where a simulated sensor takes its place.

pub mod config;
pub mod data;
pub mod simulated;
pub mod traits;

#[cfg(feature = "hardware")]
pub mod bme688;

// Re-export commonly used items
pub use config::SensorConfig;
pub use data::Reading;
pub use simulated::SimulatedSensor;
pub use traits::Sensor;

// Re-export the appropriate sensor for this build
#[cfg(feature = "hardware")]
pub use bme688::Bme688Sensor as DefaultSensor;

#[cfg(not(feature = "hardware"))]
pub use simulated::SimulatedSensor as DefaultSensor;
