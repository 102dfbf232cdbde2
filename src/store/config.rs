//! Time-series store connection settings.

use crate::error::{CollectorError, Result};
use std::fmt;
use std::time::Duration;

/// Connection settings for an InfluxDB v2 compatible store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL, e.g. `https://us-east-1-1.aws.cloud2.influxdata.com`
    pub url: String,
    /// API token with write access to the bucket
    pub token: String,
    /// Organization name or ID
    pub org: String,
    /// Destination bucket
    pub bucket: String,
    /// Per-request timeout enforced by the HTTP client
    pub timeout: Duration,
}

impl StoreConfig {
    /// Create a store configuration with the default request timeout.
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        org: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            org: org.into(),
            bucket: bucket.into(),
            timeout: Duration::from_secs(crate::DEFAULT_WRITE_TIMEOUT_SECS),
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Full URL of the v2 write endpoint (without query string).
    pub fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.base_url())
    }

    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_url())
    }

    /// Token safe for log output: a short prefix and suffix only.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() > 15 {
            let head: String = chars[..6].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "***".to_string()
        }
    }

    /// Check that every required setting is present and well formed.
    pub fn validate(&self) -> Result<()> {
        let url = self.base_url();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CollectorError::config_error(format!(
                "store URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        for (name, value) in [("token", &self.token), ("org", &self.org), ("bucket", &self.bucket)] {
            if value.trim().is_empty() {
                return Err(CollectorError::config_error(format!(
                    "store {} must not be empty",
                    name
                )));
            }
        }
        if self.timeout.is_zero() {
            return Err(CollectorError::config_error("store timeout must be non-zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("url", &self.url)
            .field("token", &self.masked_token())
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}
