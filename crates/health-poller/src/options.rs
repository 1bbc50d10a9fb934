//! Poller options.
//!
//! A [`HealthCheckOptions`] value starts from the documented defaults and
//! is then adjusted by a sequence of [`HealthCheckOption`]s, applied left to
//! right. Later options override earlier ones that target the same field.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;

use crate::clock::{Clock, SystemClock};

/// Time between two probes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
/// Time to wait after start before the polling ticker is created.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
/// Consecutive failed probes needed before reporting unhealthy.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 2;
/// Upper bound on a single probe, connect included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
/// Status code a probe response must carry to count as a success.
pub const DEFAULT_SUCCESS_STATUS_CODE: StatusCode = StatusCode::OK;

/// Resolved poller configuration. Immutable once built.
#[derive(Clone)]
pub struct HealthCheckOptions {
    interval: Duration,
    initial_delay: Duration,
    failure_threshold: u32,
    request_timeout: Duration,
    success_status_code: StatusCode,
    clock: Arc<dyn Clock>,
}

impl HealthCheckOptions {
    /// Defaults overridden by `options`, in order.
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = HealthCheckOption>,
    {
        options
            .into_iter()
            .fold(Self::default(), |resolved, option| resolved.apply(option))
    }

    /// Return a copy with a single option applied.
    pub fn apply(mut self, option: HealthCheckOption) -> Self {
        match option {
            HealthCheckOption::Interval(interval) => self.interval = interval,
            HealthCheckOption::InitialDelay(delay) => self.initial_delay = delay,
            HealthCheckOption::FailureThreshold(threshold) => self.failure_threshold = threshold,
            HealthCheckOption::RequestTimeout(timeout) => self.request_timeout = timeout,
            HealthCheckOption::SuccessStatusCode(code) => self.success_status_code = code,
            HealthCheckOption::Clock(clock) => self.clock = clock,
        }
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn success_status_code(&self) -> StatusCode {
        self.success_status_code
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            initial_delay: DEFAULT_INITIAL_DELAY,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            success_status_code: DEFAULT_SUCCESS_STATUS_CODE,
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for HealthCheckOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheckOptions")
            .field("interval", &self.interval)
            .field("initial_delay", &self.initial_delay)
            .field("failure_threshold", &self.failure_threshold)
            .field("request_timeout", &self.request_timeout)
            .field("success_status_code", &self.success_status_code.as_u16())
            .field("clock", &self.clock)
            .finish()
    }
}

/// A single override of one [`HealthCheckOptions`] field.
#[derive(Clone, Debug)]
pub enum HealthCheckOption {
    Interval(Duration),
    InitialDelay(Duration),
    FailureThreshold(u32),
    RequestTimeout(Duration),
    SuccessStatusCode(StatusCode),
    Clock(Arc<dyn Clock>),
}

/// Probe every `interval`. Must be non-zero.
pub fn with_interval(interval: Duration) -> HealthCheckOption {
    HealthCheckOption::Interval(interval)
}

/// Wait `delay` before polling starts. Zero starts the ticker immediately.
pub fn with_initial_delay(delay: Duration) -> HealthCheckOption {
    HealthCheckOption::InitialDelay(delay)
}

/// Report unhealthy after `threshold` consecutive failed probes.
pub fn with_failure_threshold(threshold: u32) -> HealthCheckOption {
    HealthCheckOption::FailureThreshold(threshold)
}

/// Abandon a probe that has not produced a response within `timeout`.
pub fn with_request_timeout(timeout: Duration) -> HealthCheckOption {
    HealthCheckOption::RequestTimeout(timeout)
}

/// Treat responses carrying `code` as successful; anything else fails.
pub fn with_success_status_code(code: StatusCode) -> HealthCheckOption {
    HealthCheckOption::SuccessStatusCode(code)
}

/// Drive delays and ticks from `clock` instead of the system clock.
pub fn with_clock<C: Clock + 'static>(clock: C) -> HealthCheckOption {
    HealthCheckOption::Clock(Arc::new(clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use std::time::Instant;

    #[test]
    fn valid_defaults() {
        let opts = HealthCheckOptions::default();
        assert_eq!(opts.interval(), Duration::from_secs(5));
        assert_eq!(opts.initial_delay(), Duration::from_secs(1));
        assert_eq!(opts.failure_threshold(), 2);
        assert_eq!(opts.request_timeout(), Duration::from_secs(2));
        assert_eq!(opts.success_status_code(), StatusCode::OK);
    }

    #[test]
    fn no_options_yields_defaults() {
        let opts = HealthCheckOptions::from_options(Vec::new());
        assert_eq!(opts.interval(), DEFAULT_INTERVAL);
        assert_eq!(opts.initial_delay(), DEFAULT_INITIAL_DELAY);
        assert_eq!(opts.failure_threshold(), DEFAULT_FAILURE_THRESHOLD);
        assert_eq!(opts.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(opts.success_status_code(), DEFAULT_SUCCESS_STATUS_CODE);
    }

    #[test]
    fn valid_custom_options() {
        let opts = HealthCheckOptions::from_options([
            with_failure_threshold(10),
            with_initial_delay(Duration::from_secs(11)),
            with_interval(Duration::from_secs(12)),
            with_request_timeout(Duration::from_secs(13)),
            with_success_status_code(StatusCode::CREATED),
        ]);
        assert_eq!(opts.failure_threshold(), 10);
        assert_eq!(opts.initial_delay(), Duration::from_secs(11));
        assert_eq!(opts.interval(), Duration::from_secs(12));
        assert_eq!(opts.request_timeout(), Duration::from_secs(13));
        assert_eq!(opts.success_status_code(), StatusCode::CREATED);
    }

    #[test]
    fn later_option_wins() {
        let opts = HealthCheckOptions::from_options([
            with_interval(Duration::from_secs(1)),
            with_failure_threshold(4),
            with_interval(Duration::from_secs(7)),
        ]);
        assert_eq!(opts.interval(), Duration::from_secs(7));
        assert_eq!(opts.failure_threshold(), 4);
        // Untouched fields keep their defaults.
        assert_eq!(opts.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn clock_option_replaces_system_clock() {
        let start = Instant::now();
        let clock = MockClock::starting_at(start);
        let opts = HealthCheckOptions::from_options([with_clock(clock.clone())]);

        clock.advance(Duration::from_secs(42));
        assert_eq!(opts.clock().now(), start + Duration::from_secs(42));
    }
}
