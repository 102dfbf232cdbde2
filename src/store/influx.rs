//! InfluxDB v2 HTTP client.

use crate::error::{CollectorError, Result};
use crate::store::{config::StoreConfig, point::Point, traits::Store};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Measurement used by [`InfluxStore::write_test_point`].
pub const CONNECTION_TEST_MEASUREMENT: &str = "connection_test";

/// Response body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Service name, usually `influxdb`
    #[serde(default)]
    pub name: Option<String>,
    /// `pass` or `fail`
    pub status: String,
    /// Human readable detail
    #[serde(default)]
    pub message: Option<String>,
    /// Server version
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    /// Whether the server reported itself healthy.
    pub fn is_pass(&self) -> bool {
        self.status.eq_ignore_ascii_case("pass")
    }
}

/// Store client for the InfluxDB v2 write API.
#[derive(Debug, Clone)]
pub struct InfluxStore {
    client: Client,
    config: StoreConfig,
}

impl InfluxStore {
    /// Create a client. No request is made until the first write.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("air_of_pi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CollectorError::config_error(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Query the server health endpoint.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.config.health_url();
        let response = self.client.get(&url).send().await.map_err(|e| {
            CollectorError::store_write_error(format!("health check against {} failed: {}", url, e))
        })?;

        let status = response.status();
        let body = response.text().await?;

        // An unhealthy server answers 503 with a JSON body describing why
        match serde_json::from_str::<HealthStatus>(&body) {
            Ok(health) => Ok(health),
            Err(_) if !status.is_success() => Err(CollectorError::store_write_error(format!(
                "health check returned {}: {}",
                status,
                body.trim()
            ))),
            Err(e) => Err(CollectorError::store_write_error(format!(
                "unexpected health response: {}",
                e
            ))),
        }
    }

    /// Write a marker point to prove the token can write to the bucket.
    pub async fn write_test_point(&self) -> Result<()> {
        let point = Point::new(CONNECTION_TEST_MEASUREMENT)
            .tag("test", "true")
            .field("value", 1.0);
        self.write(&point).await
    }
}

#[async_trait]
impl Store for InfluxStore {
    async fn write(&self, point: &Point) -> Result<()> {
        let body = point.to_line_protocol()?;
        debug!("POST {} bucket={} body={}", self.config.write_url(), self.config.bucket, body);

        let response = self
            .client
            .post(self.config.write_url())
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                CollectorError::store_write_error(format!(
                    "request to {} failed: {}",
                    self.config.base_url(),
                    e
                ))
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(CollectorError::store_write_error(format!(
            "write to bucket '{}' rejected with {}: {}",
            self.config.bucket,
            status,
            detail.trim()
        )))
    }
}
