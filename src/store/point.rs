//! InfluxDB line protocol points.

use crate::error::{CollectorError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;

/// A single time-series record: measurement, tags, float fields, timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, f64>,
    timestamp: DateTime<Utc>,
}

impl Point {
    /// Start a point for `measurement` stamped with the current time.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add or replace a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add or replace a float field.
    pub fn field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Set the point's timestamp.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Look up a field value by name.
    pub fn field_value(&self, key: &str) -> Option<f64> {
        self.fields.get(key).copied()
    }

    /// Encode as one line of InfluxDB line protocol with nanosecond precision.
    ///
    /// Empty tag values and non-finite field values are dropped. A point with
    /// no remaining fields cannot be written.
    pub fn to_line_protocol(&self) -> Result<String> {
        if self.measurement.is_empty() {
            return Err(CollectorError::store_write_error("measurement name is empty"));
        }

        let mut line = String::with_capacity(128);
        escape_into(&mut line, &self.measurement, &[',', ' ']);

        for (key, value) in &self.tags {
            if key.is_empty() || value.is_empty() {
                continue;
            }
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            if !value.is_finite() {
                tracing::debug!("Dropping non-finite field {}={}", key, value);
                continue;
            }
            line.push(separator);
            separator = ',';
            escape_into(&mut line, key, &[',', '=', ' ']);
            // Writing to a String cannot fail
            let _ = write!(line, "={}", value);
        }

        if separator == ' ' {
            return Err(CollectorError::store_write_error(format!(
                "point '{}' has no finite fields",
                self.measurement
            )));
        }

        let nanos = self.timestamp.timestamp_nanos_opt().ok_or_else(|| {
            CollectorError::store_write_error(format!(
                "timestamp {} out of nanosecond range",
                self.timestamp
            ))
        })?;
        let _ = write!(line, " {}", nanos);

        Ok(line)
    }
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}
