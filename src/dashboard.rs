//! Grafana dashboard for the collected measurement.
//!
//! The dashboard is a static document kept in `dashboard/environment.json`
//! and embedded here so the binary can print it for import.

/// Grafana dashboard JSON, one time-series panel per written field.
pub const DASHBOARD_JSON: &str = include_str!("../dashboard/environment.json");

/// Field names the dashboard panels chart.
pub const CHARTED_FIELDS: [&str; 4] = ["temperature", "humidity", "pressure", "gas_resistance"];
