//! Health poller error types.
//!
//! Probing never produces these: every probe fault is folded into a failed
//! [`ProbeResult`](crate::ProbeResult). They cover loading and validating
//! configuration before a poller is started.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building poller configuration.
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),

    #[error("invalid success status code: {0}")]
    InvalidStatusCode(u16),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate endpoint name: {0}")]
    DuplicateEndpoint(String),
}

pub type HealthResult<T> = Result<T, HealthError>;
