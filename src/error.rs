//! Error handling for the Air of Pi collector.

/// A specialized `Result` type for Air of Pi operations.
pub type Result<T> = std::result::Result<T, CollectorError>;

/// The main error type for sensor, store and configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Reading the sensor failed (I2C fault, no new data, timeout)
    #[error("Sensor read error: {0}")]
    SensorRead(String),

    /// Writing to the time-series store failed (network, auth, timeout)
    #[error("Store write error: {0}")]
    StoreWrite(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollectorError {
    /// Create a new sensor read error
    pub fn sensor_read_error(msg: impl Into<String>) -> Self {
        Self::SensorRead(msg.into())
    }

    /// Create a new store write error
    pub fn store_write_error(msg: impl Into<String>) -> Self {
        Self::StoreWrite(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error came from the sensor side of a tick.
    pub fn is_sensor(&self) -> bool {
        matches!(self, Self::SensorRead(_))
    }

    /// Whether the error came from the store side of a tick.
    pub fn is_store(&self) -> bool {
        matches!(self, Self::StoreWrite(_))
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        Self::StoreWrite(err.to_string())
    }
}
