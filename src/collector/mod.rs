//! The fixed-interval collection loop.
//!
//! Each tick reads the sensor once and forwards the reading to the store as a
//! single point. Either call failing (or exceeding its timeout) is logged and
//! the tick is skipped; there is no retry and no buffering of unsent readings.

pub mod config;

pub use config::{CollectorConfig, DEVICE_TAG};

use crate::error::{CollectorError, Result};
use crate::sensor::{Reading, Sensor};
use crate::store::{Point, Store};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Counters describing what the loop has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    /// Ticks started
    pub ticks: u64,
    /// Points accepted by the store
    pub writes: u64,
    /// Ticks skipped because the sensor failed
    pub sensor_failures: u64,
    /// Ticks where the store rejected or timed out the write
    pub store_failures: u64,
    /// Failed ticks since the last successful write
    pub consecutive_failures: u32,
}

/// Result of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The reading was written to the store
    Written(Reading),
    /// The sensor read failed; nothing was written
    SensorFailed(CollectorError),
    /// The reading was taken but the write failed
    StoreFailed(Reading, CollectorError),
}

impl TickOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }

    /// The error behind a failed tick, if any.
    pub fn error(&self) -> Option<&CollectorError> {
        match self {
            Self::Written(_) => None,
            Self::SensorFailed(err) | Self::StoreFailed(_, err) => Some(err),
        }
    }
}

/// Reads a [`Sensor`] and writes to a [`Store`] on a fixed interval.
pub struct Collector<S, W> {
    sensor: S,
    store: W,
    config: CollectorConfig,
    stats: CollectorStats,
}

impl<S: Sensor, W: Store> Collector<S, W> {
    /// Create a collector after validating its configuration.
    pub fn new(sensor: S, store: W, config: CollectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sensor,
            store,
            config,
            stats: CollectorStats::default(),
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn store(&self) -> &W {
        &self.store
    }

    /// Build the point written for `reading`.
    pub fn point_for(&self, reading: &Reading) -> Point {
        let mut point = Point::new(self.config.measurement.as_str())
            .tag(DEVICE_TAG, self.config.device_id.as_str())
            .timestamp(reading.timestamp);

        for (name, value) in reading.fields() {
            point = point.field(name, value);
        }
        if self.config.include_voc {
            point = point.field("voc", reading.voc_estimate());
        }
        point
    }

    /// Run one read-then-write iteration.
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        let reading = match time::timeout(self.config.read_timeout, self.sensor.read()).await {
            Ok(Ok(reading)) => reading,
            Ok(Err(err)) => return self.sensor_failed(err),
            Err(_) => {
                let err = CollectorError::sensor_read_error(format!(
                    "read timed out after {:?}",
                    self.config.read_timeout
                ));
                return self.sensor_failed(err);
            }
        };

        debug!(
            "{}: {:.2}°C {:.2}%RH {:.2}hPa {:.0}Ω",
            self.sensor.name(),
            reading.temperature,
            reading.humidity,
            reading.pressure,
            reading.gas_resistance
        );

        let point = self.point_for(&reading);
        match time::timeout(self.config.write_timeout, self.store.write(&point)).await {
            Ok(Ok(())) => self.written(reading),
            Ok(Err(err)) => self.store_failed(reading, err),
            Err(_) => {
                let err = CollectorError::store_write_error(format!(
                    "write timed out after {:?}",
                    self.config.write_timeout
                ));
                self.store_failed(reading, err)
            }
        }
    }

    /// Tick on the configured interval until `shutdown` resolves.
    ///
    /// The first tick happens immediately. A tick in progress when shutdown
    /// is requested is allowed to finish.
    pub async fn run<F>(&mut self, shutdown: F) -> CollectorStats
    where
        F: Future<Output = ()>,
    {
        let mut interval = time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            "Collecting from {} every {:?} as {}={}",
            self.sensor.name(),
            self.config.interval,
            DEVICE_TAG,
            self.config.device_id
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping collector");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        self.stats
    }

    fn written(&mut self, reading: Reading) -> TickOutcome {
        self.stats.writes += 1;
        let failures = self.stats.consecutive_failures;
        if failures >= self.config.failure_alert_threshold {
            info!("Writes recovered after {} failed tick(s)", failures);
        } else if failures > 0 {
            debug!("Write succeeded after {} failed tick(s)", failures);
        }
        self.stats.consecutive_failures = 0;
        debug!("Reading written to '{}'", self.config.measurement);
        TickOutcome::Written(reading)
    }

    fn sensor_failed(&mut self, err: CollectorError) -> TickOutcome {
        self.stats.sensor_failures += 1;
        warn!("Skipping tick, {} read failed: {}", self.sensor.name(), err);
        self.note_failure();
        TickOutcome::SensorFailed(err)
    }

    fn store_failed(&mut self, reading: Reading, err: CollectorError) -> TickOutcome {
        self.stats.store_failures += 1;
        warn!("Dropping reading taken at {}: {}", reading.timestamp, err);
        self.note_failure();
        TickOutcome::StoreFailed(reading, err)
    }

    fn note_failure(&mut self) {
        self.stats.consecutive_failures = self.stats.consecutive_failures.saturating_add(1);
        if self.stats.consecutive_failures == self.config.failure_alert_threshold {
            error!(
                "No successful write in {} consecutive ticks; still collecting",
                self.stats.consecutive_failures
            );
        }
    }
}
