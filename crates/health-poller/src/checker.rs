//! Debouncing of probe results into health transitions.
//!
//! The tracker turns a sequence of binary probe verdicts into an
//! edge-triggered transition log:
//!
//! ```text
//! Unknown ──success──────────────────────▶ Healthy   (emit true)
//! Unknown ──failure × threshold──────────▶ Unhealthy (emit false)
//! Healthy ──failure × threshold──────────▶ Unhealthy (emit false)
//! Unhealthy ──success────────────────────▶ Healthy   (emit true)
//! ```
//!
//! A single success is enough to recover. Repeated outcomes that agree with
//! the last reported state are never re-emitted.

use tracing::debug;

/// Verdict of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// A response arrived in time with the expected status code.
    Success,
    /// Transport error, timeout, unexpected status, or unusable endpoint.
    Failure,
}

/// Last health state reported by a [`HealthTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    /// Nothing reported yet.
    #[default]
    Unknown,
    Healthy,
    Unhealthy,
}

/// Tracks consecutive probe results for a single endpoint.
#[derive(Debug)]
pub struct HealthTracker {
    /// Last state reported to the consumer.
    last_reported: HealthStatus,
    /// Consecutive failures since the last success or report.
    consecutive_failures: u32,
    /// Failures needed before reporting unhealthy.
    failure_threshold: u32,
}

impl HealthTracker {
    /// Create a tracker that reports unhealthy after `failure_threshold`
    /// consecutive failures. A threshold of zero behaves like one.
    pub fn new(failure_threshold: u32) -> Self {
        Self {
            last_reported: HealthStatus::Unknown,
            consecutive_failures: 0,
            failure_threshold,
        }
    }

    /// Record a probe result, returning a signal if the reported state
    /// changed: `Some(true)` for healthy, `Some(false)` for unhealthy.
    pub fn observe(&mut self, result: ProbeResult) -> Option<bool> {
        match result {
            ProbeResult::Success => {
                self.consecutive_failures = 0;
                if self.last_reported == HealthStatus::Healthy {
                    return None;
                }
                debug!(previous = ?self.last_reported, "endpoint reported healthy");
                self.last_reported = HealthStatus::Healthy;
                Some(true)
            }
            ProbeResult::Failure => {
                self.consecutive_failures += 1;
                if self.consecutive_failures < self.failure_threshold {
                    return None;
                }

                let failures = self.consecutive_failures;
                self.consecutive_failures = 0;
                if self.last_reported == HealthStatus::Unhealthy {
                    return None;
                }
                debug!(
                    failures,
                    threshold = self.failure_threshold,
                    previous = ?self.last_reported,
                    "endpoint reported unhealthy"
                );
                self.last_reported = HealthStatus::Unhealthy;
                Some(false)
            }
        }
    }

    #[cfg(test)]
    fn status(&self) -> HealthStatus {
        self.last_reported
    }

    #[cfg(test)]
    fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProbeResult::{Failure, Success};

    fn run(tracker: &mut HealthTracker, results: &[ProbeResult]) -> Vec<Option<bool>> {
        results.iter().map(|r| tracker.observe(*r)).collect()
    }

    #[test]
    fn tracker_starts_unknown() {
        let tracker = HealthTracker::new(3);
        assert_eq!(tracker.status(), HealthStatus::Unknown);
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn first_success_reports_healthy() {
        let mut tracker = HealthTracker::new(3);
        assert_eq!(tracker.observe(Success), Some(true));
        assert_eq!(tracker.status(), HealthStatus::Healthy);
    }

    #[test]
    fn repeated_success_is_silent() {
        let mut tracker = HealthTracker::new(3);
        let signals = run(&mut tracker, &[Success, Success, Success]);
        assert_eq!(signals, vec![Some(true), None, None]);
    }

    #[test]
    fn stays_healthy_under_threshold() {
        let mut tracker = HealthTracker::new(3);
        tracker.observe(Success);

        let signals = run(&mut tracker, &[Failure, Failure]);
        assert_eq!(signals, vec![None, None]);
        assert_eq!(tracker.status(), HealthStatus::Healthy);
        assert_eq!(tracker.consecutive_failures(), 2);
    }

    #[test]
    fn reports_unhealthy_at_threshold() {
        let mut tracker = HealthTracker::new(3);
        tracker.observe(Success);

        let signals = run(&mut tracker, &[Failure, Failure, Failure]);
        assert_eq!(signals, vec![None, None, Some(false)]);
        assert_eq!(tracker.status(), HealthStatus::Unhealthy);
        // The counter restarts once the threshold is crossed.
        assert_eq!(tracker.consecutive_failures(), 0);
    }

    #[test]
    fn unknown_to_unhealthy_needs_threshold() {
        let mut tracker = HealthTracker::new(2);
        let signals = run(&mut tracker, &[Failure, Failure]);
        assert_eq!(signals, vec![None, Some(false)]);
    }

    #[test]
    fn success_resets_failure_count() {
        let mut tracker = HealthTracker::new(3);
        let signals = run(
            &mut tracker,
            &[Success, Failure, Failure, Success, Failure, Failure],
        );
        assert!(signals[1..].iter().all(Option::is_none));
        assert_eq!(tracker.status(), HealthStatus::Healthy);
        assert_eq!(tracker.consecutive_failures(), 2);
    }

    #[test]
    fn persistent_failure_reports_once() {
        let mut tracker = HealthTracker::new(2);
        let signals = run(&mut tracker, &[Failure; 8]);
        assert_eq!(signals.iter().filter(|s| s.is_some()).count(), 1);
        assert_eq!(signals[1], Some(false));
    }

    #[test]
    fn recovers_on_single_success() {
        let mut tracker = HealthTracker::new(3);
        run(&mut tracker, &[Failure, Failure, Failure]);
        assert_eq!(tracker.status(), HealthStatus::Unhealthy);

        assert_eq!(tracker.observe(Success), Some(true));
        assert_eq!(tracker.status(), HealthStatus::Healthy);
    }

    #[test]
    fn threshold_one_reports_every_flap() {
        let mut tracker = HealthTracker::new(1);
        let signals = run(&mut tracker, &[Failure, Success, Failure, Failure, Success]);
        assert_eq!(
            signals,
            vec![Some(false), Some(true), Some(false), None, Some(true)]
        );
    }

    #[test]
    fn threshold_zero_behaves_like_one() {
        let mut tracker = HealthTracker::new(0);
        assert_eq!(tracker.observe(Failure), Some(false));
    }

    #[test]
    fn emitted_signals_always_alternate() {
        // Deterministic pseudo-random outcome sequences over a few thresholds.
        for threshold in 1..=4 {
            let mut seed: u32 = 0x9e37_79b9 ^ threshold;
            let mut tracker = HealthTracker::new(threshold);
            let mut last: Option<bool> = None;
            let mut consecutive_failures = 0;

            for _ in 0..500 {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                let result = if seed % 3 == 0 { Success } else { Failure };

                let previous = tracker.status();
                let signal = tracker.observe(result);

                match result {
                    Success => {
                        consecutive_failures = 0;
                        assert_eq!(signal.is_some(), previous != HealthStatus::Healthy);
                    }
                    Failure => {
                        consecutive_failures += 1;
                        let crossed = consecutive_failures >= threshold;
                        if crossed {
                            consecutive_failures = 0;
                        }
                        assert_eq!(
                            signal.is_some(),
                            crossed && previous != HealthStatus::Unhealthy
                        );
                    }
                }

                if let Some(value) = signal {
                    assert_ne!(last, Some(value), "same signal emitted twice in a row");
                    last = Some(value);
                }
            }
        }
    }
}
