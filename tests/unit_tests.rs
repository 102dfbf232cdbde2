use air_of_pi::{
    collector::{Collector, CollectorConfig, TickOutcome},
    dashboard::{CHARTED_FIELDS, DASHBOARD_JSON},
    error::{CollectorError, Result},
    sensor::{Reading, Sensor, SensorConfig, SimulatedSensor},
    store::{Point, Store, StoreConfig},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

/// Sensor that plays back a script, then repeats a fallback reading.
struct ScriptedSensor {
    script: VecDeque<Result<Reading>>,
    fallback: Reading,
    delay: Option<Duration>,
    reads: usize,
}

impl ScriptedSensor {
    fn new(fallback: Reading) -> Self {
        Self {
            script: VecDeque::new(),
            fallback,
            delay: None,
            reads: 0,
        }
    }

    fn then_fail(mut self, msg: &str) -> Self {
        self.script
            .push_back(Err(CollectorError::sensor_read_error(msg)));
        self
    }

    fn then_read(mut self, reading: Reading) -> Self {
        self.script.push_back(Ok(reading));
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl Sensor for ScriptedSensor {
    async fn read(&mut self) -> Result<Reading> {
        self.reads += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.pop_front() {
            Some(result) => result,
            None => Ok(Reading::new(
                self.fallback.temperature,
                self.fallback.humidity,
                self.fallback.pressure,
                self.fallback.gas_resistance,
            )),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Store that records every write and can be told to fail or stall.
#[derive(Default)]
struct RecordingStore {
    writes: Mutex<Vec<(Instant, Point)>>,
    failures_left: Mutex<usize>,
    fail_always: bool,
    delay: Option<Duration>,
}

impl RecordingStore {
    fn failing() -> Self {
        Self {
            fail_always: true,
            ..Default::default()
        }
    }

    fn failing_first(n: usize) -> Self {
        Self {
            failures_left: Mutex::new(n),
            ..Default::default()
        }
    }

    fn stalling(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn points(&self) -> Vec<Point> {
        self.writes.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
    }

    fn instants(&self) -> Vec<Instant> {
        self.writes.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    fn attempts(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

#[async_trait]
impl Store for RecordingStore {
    async fn write(&self, point: &Point) -> Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.writes
            .lock()
            .unwrap()
            .push((Instant::now(), point.clone()));

        if self.fail_always {
            return Err(CollectorError::store_write_error("401 unauthorized"));
        }
        let mut left = self.failures_left.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            return Err(CollectorError::store_write_error("connection refused"));
        }
        Ok(())
    }
}

/// Shared buffer that collects formatted log output.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn lines_containing(&self, needle: &str) -> Vec<String> {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn scenario_reading() -> Reading {
    Reading::new(22.5, 45.0, 1013.2, 50_000.0)
}

fn config() -> CollectorConfig {
    CollectorConfig::new(Duration::from_secs(60))
        .with_read_timeout(Duration::from_secs(5))
        .with_write_timeout(Duration::from_secs(5))
        .with_device_id("test-pi")
}

/// A successful tick writes exactly one point carrying the sensor's values
#[tokio::test]
async fn test_successful_tick_writes_reading() {
    let before = Utc::now();
    let mut collector = assert_ok!(Collector::new(
        ScriptedSensor::new(scenario_reading()),
        RecordingStore::default(),
        config(),
    ));

    let outcome = collector.tick().await;
    assert!(outcome.is_written());

    let points = collector.store().points();
    assert_eq!(points.len(), 1);

    let point = &points[0];
    assert_eq!(point.measurement(), "environment");
    assert_eq!(point.tags().get("device").map(String::as_str), Some("test-pi"));
    assert_eq!(point.field_value("temperature"), Some(22.5));
    assert_eq!(point.field_value("humidity"), Some(45.0));
    assert_eq!(point.field_value("pressure"), Some(1013.2));
    assert_eq!(point.field_value("gas_resistance"), Some(50_000.0));
    assert_eq!(point.fields().len(), 4);
    assert!(point.time() >= before);
    assert!(point.time() <= Utc::now());
}

/// A failed read results in no write for that tick, and the next tick proceeds
#[tokio::test]
async fn test_sensor_failure_skips_write() {
    let sensor = ScriptedSensor::new(scenario_reading()).then_fail("I2C NACK at 0x77");
    let mut collector = assert_ok!(Collector::new(sensor, RecordingStore::default(), config()));

    let outcome = collector.tick().await;
    match &outcome {
        TickOutcome::SensorFailed(err) => assert!(err.is_sensor()),
        other => panic!("expected sensor failure, got {:?}", other),
    }
    assert_eq!(collector.store().attempts(), 0);

    let outcome = collector.tick().await;
    assert!(outcome.is_written());
    assert_eq!(collector.store().attempts(), 1);

    let stats = collector.stats();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.sensor_failures, 1);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.consecutive_failures, 0);
}

/// A failed write is reported and does not stop later ticks
#[tokio::test]
async fn test_store_failure_is_not_fatal() {
    let mut collector = assert_ok!(Collector::new(
        ScriptedSensor::new(scenario_reading()),
        RecordingStore::failing_first(2),
        config(),
    ));

    for _ in 0..2 {
        let outcome = collector.tick().await;
        let err = outcome.error().expect("write should fail");
        assert!(err.is_store());
        assert!(matches!(outcome, TickOutcome::StoreFailed(_, _)));
    }
    assert_eq!(collector.stats().consecutive_failures, 2);

    assert!(collector.tick().await.is_written());
    let stats = collector.stats();
    assert_eq!(stats.store_failures, 2);
    assert_eq!(stats.writes, 1);
    assert_eq!(stats.consecutive_failures, 0);
    assert_eq!(collector.store().attempts(), 3);
}

/// A sensor that hangs is cut off by the read timeout
#[tokio::test(start_paused = true)]
async fn test_sensor_read_timeout() {
    let sensor = ScriptedSensor::new(scenario_reading()).with_delay(Duration::from_secs(30));
    let mut collector = assert_ok!(Collector::new(sensor, RecordingStore::default(), config()));

    let started = Instant::now();
    let outcome = collector.tick().await;

    let err = outcome.error().expect("read should time out");
    assert!(err.is_sensor());
    assert!(err.to_string().contains("timed out"));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(collector.store().attempts(), 0);
}

/// A store that hangs is cut off by the write timeout
#[tokio::test(start_paused = true)]
async fn test_store_write_timeout() {
    let mut collector = assert_ok!(Collector::new(
        ScriptedSensor::new(scenario_reading()),
        RecordingStore::stalling(Duration::from_secs(120)),
        config(),
    ));

    let outcome = collector.tick().await;
    match outcome {
        TickOutcome::StoreFailed(reading, err) => {
            assert_eq!(reading.temperature, 22.5);
            assert!(err.to_string().contains("timed out"));
        }
        other => panic!("expected store timeout, got {:?}", other),
    }
    assert_eq!(collector.stats().store_failures, 1);
}

/// Successive writes are one interval apart
#[tokio::test(start_paused = true)]
async fn test_run_ticks_on_interval() {
    let mut collector = assert_ok!(Collector::new(
        ScriptedSensor::new(scenario_reading()),
        RecordingStore::default(),
        config(),
    ));

    let stats = collector
        .run(tokio::time::sleep(Duration::from_secs(185)))
        .await;

    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.writes, 4);

    let instants = collector.store().instants();
    assert_eq!(instants.len(), 4);
    for pair in instants.windows(2) {
        assert_eq!(pair[1] - pair[0], Duration::from_secs(60));
    }
}

/// The loop keeps running through a store that never accepts a write
#[tokio::test(start_paused = true)]
async fn test_run_survives_persistent_store_failure() {
    let mut collector = assert_ok!(Collector::new(
        ScriptedSensor::new(scenario_reading()),
        RecordingStore::failing(),
        config().with_failure_alert_threshold(3),
    ));

    let stats = collector
        .run(tokio::time::sleep(Duration::from_secs(60 * 9 + 30)))
        .await;

    assert_eq!(stats.ticks, 10);
    assert_eq!(stats.writes, 0);
    assert_eq!(stats.store_failures, 10);
    assert_eq!(stats.consecutive_failures, 10);
    assert_eq!(collector.store().attempts(), 10);
}

/// A failure streak logs one error at the threshold and one recovery line
#[tokio::test]
async fn test_failure_streak_alert_and_recovery_logging() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut sensor = ScriptedSensor::new(scenario_reading());
    for _ in 0..10 {
        sensor = sensor.then_fail("I2C NACK at 0x77");
    }
    sensor = sensor.then_read(scenario_reading());
    for _ in 0..2 {
        sensor = sensor.then_fail("I2C NACK at 0x77");
    }
    sensor = sensor.then_read(scenario_reading());
    for _ in 0..3 {
        sensor = sensor.then_fail("I2C NACK at 0x77");
    }

    let mut collector = assert_ok!(Collector::new(
        sensor,
        RecordingStore::default(),
        config().with_failure_alert_threshold(3),
    ));

    for _ in 0..10 {
        assert!(!collector.tick().await.is_written());
    }
    let alerts = logs.lines_containing("No successful write in");
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("ERROR"));
    assert!(alerts[0].contains("3 consecutive ticks"));
    assert!(logs.lines_containing("Writes recovered").is_empty());

    assert!(collector.tick().await.is_written());
    let recoveries = logs.lines_containing("Writes recovered");
    assert_eq!(recoveries.len(), 1);
    assert!(recoveries[0].contains("INFO"));
    assert!(recoveries[0].contains("after 10 failed tick(s)"));

    // A streak shorter than the threshold neither alerts nor announces recovery.
    for _ in 0..2 {
        assert!(!collector.tick().await.is_written());
    }
    assert!(collector.tick().await.is_written());
    assert_eq!(logs.lines_containing("No successful write in").len(), 1);
    assert_eq!(logs.lines_containing("Writes recovered").len(), 1);

    for _ in 0..3 {
        assert!(!collector.tick().await.is_written());
    }
    assert_eq!(logs.lines_containing("No successful write in").len(), 2);

    assert!(collector.tick().await.is_written());
    assert_eq!(logs.lines_containing("Writes recovered").len(), 2);
    assert_eq!(collector.stats().consecutive_failures, 0);
}

/// Mixed failures across a run are each counted once
#[tokio::test(start_paused = true)]
async fn test_run_counts_mixed_failures() {
    let sensor = ScriptedSensor::new(scenario_reading())
        .then_fail("bus error")
        .then_fail("bus error");
    let mut collector = assert_ok!(Collector::new(
        sensor,
        RecordingStore::failing_first(1),
        config(),
    ));

    let stats = collector
        .run(tokio::time::sleep(Duration::from_secs(60 * 4 + 1)))
        .await;

    assert_eq!(stats.ticks, 5);
    assert_eq!(stats.sensor_failures, 2);
    assert_eq!(stats.store_failures, 1);
    assert_eq!(stats.writes, 2);
    assert_eq!(collector.sensor().reads, 5);
}

/// The derived VOC field is only written when enabled
#[tokio::test]
async fn test_voc_field_opt_in() {
    let mut collector = assert_ok!(Collector::new(
        ScriptedSensor::new(Reading::new(21.0, 40.0, 1000.0, 150_000.0)),
        RecordingStore::default(),
        config().with_voc(true),
    ));
    assert!(collector.tick().await.is_written());

    let points = collector.store().points();
    assert_eq!(points[0].field_value("voc"), Some(3.0));
}

/// The simulated sensor drives the loop end to end
#[tokio::test]
async fn test_simulated_sensor_with_collector() {
    let sensor = assert_ok!(SimulatedSensor::open(&SensorConfig::default()));
    let mut collector = assert_ok!(Collector::new(sensor, RecordingStore::default(), config()));

    for _ in 0..3 {
        assert!(collector.tick().await.is_written());
    }

    let line = assert_ok!(collector.store().points()[0].to_line_protocol());
    assert!(line.starts_with("environment,device=test-pi gas_resistance=55000,"));
}

/// Invalid configuration is rejected before the loop starts
#[test]
fn test_collector_config_validation() {
    assert!(Collector::new(
        ScriptedSensor::new(scenario_reading()),
        RecordingStore::default(),
        config().with_interval(Duration::ZERO),
    )
    .is_err());
    assert_err!(SensorConfig::new(1, 0x40).validate());
    assert_err!(StoreConfig::new("http://localhost:8086", "", "org", "bucket").validate());
}

/// Test CollectorError creation and formatting
#[test]
fn test_collector_error_types() {
    let sensor = CollectorError::sensor_read_error("I2C NACK");
    assert!(format!("{}", sensor).contains("I2C NACK"));
    assert!(sensor.is_sensor());
    assert!(!sensor.is_store());

    let store = CollectorError::store_write_error("503 Service Unavailable");
    assert!(format!("{}", store).contains("503"));
    assert!(store.is_store());

    let config = CollectorError::config_error("interval must be non-zero");
    assert!(format!("{}", config).contains("interval"));

    let io: CollectorError = std::io::Error::new(std::io::ErrorKind::NotFound, "/dev/i2c-1").into();
    assert!(format!("{}", io).contains("/dev/i2c-1"));
}

/// The dashboard charts every written field from the written measurement
#[test]
fn test_dashboard_matches_written_fields() {
    let dashboard: serde_json::Value = assert_ok!(serde_json::from_str(DASHBOARD_JSON));
    let panels = dashboard["panels"].as_array().expect("panels array");
    assert_eq!(panels.len(), CHARTED_FIELDS.len());

    let queries: Vec<&str> = panels
        .iter()
        .flat_map(|panel| panel["targets"].as_array().into_iter().flatten())
        .filter_map(|target| target["query"].as_str())
        .collect();
    assert_eq!(queries.len(), panels.len());

    for query in &queries {
        assert!(query.contains(r#"r._measurement == "environment""#));
    }
    for field in CHARTED_FIELDS {
        let filter = format!(r#"r._field == "{}""#, field);
        assert!(
            queries.iter().any(|q| q.contains(&filter)),
            "no panel charts {}",
            field
        );
    }

    let written: Vec<&str> = scenario_reading().fields().iter().map(|(name, _)| *name).collect();
    assert_eq!(written, CHARTED_FIELDS.to_vec());
}
