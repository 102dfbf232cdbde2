//! Time-series store access.
//!
//! Points are encoded as InfluxDB line protocol and written over HTTP to an
//! InfluxDB v2 compatible endpoint (InfluxDB OSS 2.x, InfluxDB Cloud).

pub mod config;
pub mod influx;
pub mod point;
pub mod traits;

// Re-export commonly used items
pub use config::StoreConfig;
pub use influx::{HealthStatus, InfluxStore};
pub use point::Point;
pub use traits::Store;
