//! TOML configuration for health pollers.
//!
//! ```toml
//! [[endpoints]]
//! name = "api"
//! endpoint = "http://127.0.0.1:8080/healthz"
//! interval = "5s"
//! initial_delay = "1s"
//! request_timeout = "500ms"
//! failure_threshold = 3
//! success_status_code = 204
//! ```
//!
//! Every field except `endpoint` (and `name`) is optional and falls back
//! to the poller defaults.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::{HealthError, HealthResult};
use crate::options::{
    HealthCheckOption, with_failure_threshold, with_initial_delay, with_interval,
    with_request_timeout, with_success_status_code,
};

/// Poller settings for one endpoint, as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub endpoint: String,
    pub interval: Option<String>,
    pub initial_delay: Option<String>,
    pub request_timeout: Option<String>,
    pub failure_threshold: Option<u32>,
    pub success_status_code: Option<u16>,
}

impl HealthCheckConfig {
    /// A config for `endpoint` with every tunable left at its default.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            interval: None,
            initial_delay: None,
            request_timeout: None,
            failure_threshold: None,
            success_status_code: None,
        }
    }

    /// Convert the set fields into poller options.
    pub fn to_options(&self) -> HealthResult<Vec<HealthCheckOption>> {
        let mut options = Vec::new();

        if let Some(interval) = &self.interval {
            options.push(with_interval(parse_duration(interval)?));
        }
        if let Some(delay) = &self.initial_delay {
            options.push(with_initial_delay(parse_duration(delay)?));
        }
        if let Some(timeout) = &self.request_timeout {
            options.push(with_request_timeout(parse_duration(timeout)?));
        }
        if let Some(threshold) = self.failure_threshold {
            options.push(with_failure_threshold(threshold));
        }
        if let Some(code) = self.success_status_code {
            let status =
                StatusCode::from_u16(code).map_err(|_| HealthError::InvalidStatusCode(code))?;
            options.push(with_success_status_code(status));
        }

        Ok(options)
    }
}

/// A named endpoint entry in a [`MonitorConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEndpoint {
    pub name: String,
    #[serde(flatten)]
    pub health: HealthCheckConfig,
}

/// A set of endpoints to watch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub endpoints: Vec<NamedEndpoint>,
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> HealthResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HealthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config. Endpoint names must be unique and every
    /// entry must convert to valid options.
    pub fn from_toml_str(content: &str) -> HealthResult<Self> {
        let config: MonitorConfig = toml::from_str(content)?;

        let mut seen = HashSet::new();
        for entry in &config.endpoints {
            if !seen.insert(entry.name.as_str()) {
                return Err(HealthError::DuplicateEndpoint(entry.name.clone()));
            }
            entry.health.to_options()?;
        }

        Ok(config)
    }
}

/// Parse a duration string like "5s", "500ms", "2m", or a bare number of
/// seconds.
pub fn parse_duration(s: &str) -> HealthResult<Duration> {
    let s = s.trim();
    let invalid = || HealthError::InvalidDuration(s.to_string());

    let (digits, unit): (&str, fn(u64) -> Duration) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, |m| Duration::from_secs(m.saturating_mul(60)))
    } else {
        (s, Duration::from_secs)
    };

    digits.trim().parse::<u64>().map(unit).map_err(|_| invalid())
}
