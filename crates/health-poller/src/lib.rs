//! health-poller — debounced health checking for a single HTTP endpoint.
//!
//! A poller runs as a background task per endpoint. On every clock tick it
//! issues one bounded-timeout probe, folds the verdict into a debouncing
//! state machine, and reports *transitions* (not levels) on a channel.
//!
//! # Architecture
//!
//! ```text
//! start_health_check()
//!   └── Background task (one per endpoint)
//!       ├── Clock (SystemClock in production, MockClock in tests)
//!       ├── HttpProber::probe() → ProbeResult
//!       ├── HealthTracker::observe() → Option<bool>
//!       └── mpsc::Sender<bool> (closed on cancellation)
//!
//! HealthMonitor
//!   └── Named pollers, each on a child CancellationToken
//! ```
//!
//! # Debouncing
//!
//! One successful probe is enough to report `true`. Reporting `false`
//! takes `failure_threshold` consecutive failed probes. A state is
//! reported once; repeated identical outcomes are silent.
//!
//! ```no_run
//! use std::time::Duration;
//! use health_poller::{start_health_check, with_failure_threshold, with_interval};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() {
//! let cancel = CancellationToken::new();
//! let mut signals = start_health_check(
//!     cancel.clone(),
//!     "http://127.0.0.1:8080/healthz",
//!     [with_interval(Duration::from_secs(1)), with_failure_threshold(3)],
//! );
//! while let Some(healthy) = signals.recv().await {
//!     println!("healthy: {healthy}");
//! }
//! # }
//! ```

pub mod checker;
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod options;
pub mod probe;

pub use checker::{HealthStatus, HealthTracker, ProbeResult};
pub use clock::{Clock, MockClock, SystemClock, Ticker};
pub use config::{HealthCheckConfig, MonitorConfig, NamedEndpoint, parse_duration};
pub use error::{HealthError, HealthResult};
pub use monitor::{HealthMonitor, start_health_check};
pub use options::{
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_INITIAL_DELAY, DEFAULT_INTERVAL, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SUCCESS_STATUS_CODE, HealthCheckOption, HealthCheckOptions, with_clock,
    with_failure_threshold, with_initial_delay, with_interval, with_request_timeout,
    with_success_status_code,
};
pub use probe::{HttpProber, Prober};

/// Boxed, sendable future used at the crate's trait seams.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
