//! Collector loop configuration.

use crate::error::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tag key carrying the source identifier on every point.
pub const DEVICE_TAG: &str = "device";

/// Settings for the fixed-interval collection loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorConfig {
    /// Time between ticks
    pub interval: Duration,
    /// Upper bound on one sensor read
    pub read_timeout: Duration,
    /// Upper bound on one store write
    pub write_timeout: Duration,
    /// Measurement name written to the store
    pub measurement: String,
    /// Value of the `device` tag
    pub device_id: String,
    /// Also write the derived `voc` field
    pub include_voc: bool,
    /// Consecutive failed ticks before an error is logged
    pub failure_alert_threshold: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(crate::DEFAULT_INTERVAL_SECS),
            read_timeout: Duration::from_secs(crate::DEFAULT_READ_TIMEOUT_SECS),
            write_timeout: Duration::from_secs(crate::DEFAULT_WRITE_TIMEOUT_SECS),
            measurement: crate::DEFAULT_MEASUREMENT.to_string(),
            device_id: default_device_id(),
            include_voc: false,
            failure_alert_threshold: crate::DEFAULT_FAILURE_ALERT_THRESHOLD,
        }
    }
}

impl CollectorConfig {
    /// Create a configuration with a custom interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the sensor read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the store write timeout.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the measurement name.
    pub fn with_measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    /// Set the source identifier.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = device_id.into();
        self
    }

    /// Enable or disable the derived `voc` field.
    pub fn with_voc(mut self, include_voc: bool) -> Self {
        self.include_voc = include_voc;
        self
    }

    /// Set how many consecutive failed ticks trigger an error log.
    pub fn with_failure_alert_threshold(mut self, threshold: u32) -> Self {
        self.failure_alert_threshold = threshold;
        self
    }

    /// Whether both bounded calls together fit inside one interval.
    pub fn timeouts_fit_interval(&self) -> bool {
        self.read_timeout
            .checked_add(self.write_timeout)
            .map_or(false, |total| total <= self.interval)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(CollectorError::config_error("interval must be non-zero"));
        }
        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(CollectorError::config_error("timeouts must be non-zero"));
        }
        if self.failure_alert_threshold == 0 {
            return Err(CollectorError::config_error(
                "failure alert threshold must be at least 1",
            ));
        }
        if self.measurement.trim().is_empty() {
            return Err(CollectorError::config_error("measurement name must not be empty"));
        }
        if self.device_id.trim().is_empty() {
            return Err(CollectorError::config_error("device id must not be empty"));
        }
        Ok(())
    }
}

/// Hostname of this machine, or `unknown` when it cannot be determined.
pub fn default_device_id() -> String {
    sysinfo::System::host_name()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
