//! Time source for the poller.
//!
//! The poller never touches the system clock directly. Production code
//! uses [`SystemClock`] (tokio timers); tests drive a [`MockClock`] by hand
//! so multi-tick scenarios run without real sleeping.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::BoxFuture;

/// A source of time the poller can sleep and tick on.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant according to this clock.
    fn now(&self) -> Instant;

    /// Sleep until `duration` has elapsed on this clock.
    ///
    /// The deadline is fixed when `sleep` is called, not when the returned
    /// future is first polled.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// A ticker that first fires one full `interval` after creation and then
    /// every `interval` after that.
    ///
    /// Panics if `interval` is zero.
    fn ticker(&self, interval: Duration) -> Box<dyn Ticker>;
}

/// A repeating tick source created by [`Clock::ticker`].
pub trait Ticker: Send {
    /// Wait for the next tick and return the instant it was scheduled for.
    ///
    /// Cancel-safe: dropping the future before it completes loses no tick.
    fn tick(&mut self) -> BoxFuture<'_, Instant>;
}

// ── System clock ─────────────────────────────────────────────────────

/// Wall-clock time backed by tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn ticker(&self, interval: Duration) -> Box<dyn Ticker> {
        let start = tokio::time::Instant::now() + interval;
        let mut interval = tokio::time::interval_at(start, interval);
        // A slow probe should not cause a burst of catch-up probes.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Box::new(SystemTicker { interval })
    }
}

struct SystemTicker {
    interval: tokio::time::Interval,
}

impl Ticker for SystemTicker {
    fn tick(&mut self) -> BoxFuture<'_, Instant> {
        Box::pin(async move { self.interval.tick().await.into_std() })
    }
}

// ── Mock clock ───────────────────────────────────────────────────────

/// A virtual clock that only moves when told to.
///
/// Clones share the same time. Sleepers and tickers created from any clone
/// wake up when [`advance`](MockClock::advance) or [`set`](MockClock::set)
/// moves time past their deadline. If time jumps over several intervals a
/// ticker fires once and skips the ticks it missed.
#[derive(Clone)]
pub struct MockClock {
    now: Arc<watch::Sender<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at the current wall-clock instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a mock clock starting at `start`.
    pub fn starting_at(start: Instant) -> Self {
        let (tx, _rx) = watch::channel(start);
        Self { now: Arc::new(tx) }
    }

    /// Move time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.now.send_modify(|now| *now += duration);
    }

    /// Jump to `instant`. Time never moves backwards; an earlier instant is
    /// ignored.
    pub fn set(&self, instant: Instant) {
        self.now.send_modify(|now| {
            if instant > *now {
                *now = instant;
            }
        });
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockClock")
            .field("now", &*self.now.borrow())
            .finish()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.borrow()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let mut rx = self.now.subscribe();
        let deadline = *rx.borrow_and_update() + duration;
        Box::pin(async move {
            wait_until(&mut rx, deadline).await;
        })
    }

    fn ticker(&self, interval: Duration) -> Box<dyn Ticker> {
        assert!(!interval.is_zero(), "ticker interval must be non-zero");
        let mut rx = self.now.subscribe();
        let next = *rx.borrow_and_update() + interval;
        Box::new(MockTicker { rx, next, interval })
    }
}

struct MockTicker {
    rx: watch::Receiver<Instant>,
    next: Instant,
    interval: Duration,
}

impl Ticker for MockTicker {
    fn tick(&mut self) -> BoxFuture<'_, Instant> {
        Box::pin(async move {
            let now = wait_until(&mut self.rx, self.next).await;
            let fired = self.next;
            while self.next <= now {
                self.next += self.interval;
            }
            fired
        })
    }
}

/// Wait until the mock time reaches `deadline`, returning the time observed.
async fn wait_until(rx: &mut watch::Receiver<Instant>, deadline: Instant) -> Instant {
    loop {
        let now = *rx.borrow_and_update();
        if now >= deadline {
            return now;
        }
        if rx.changed().await.is_err() {
            // Every clock handle is gone; time can never reach the deadline.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn is_pending<F: std::future::Future + Unpin>(fut: &mut F) -> bool {
        tokio::time::timeout(Duration::from_millis(20), fut)
            .await
            .is_err()
    }

    #[test]
    fn mock_clock_advances() {
        let start = Instant::now();
        let clock = MockClock::starting_at(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.now(), start + Duration::from_secs(3));
    }

    #[test]
    fn mock_clock_set_never_goes_backwards() {
        let start = Instant::now();
        let clock = MockClock::starting_at(start + Duration::from_secs(10));

        clock.set(start);
        assert_eq!(clock.now(), start + Duration::from_secs(10));

        clock.set(start + Duration::from_secs(15));
        assert_eq!(clock.now(), start + Duration::from_secs(15));
    }

    #[test]
    fn clones_share_time() {
        let clock = MockClock::new();
        let other = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.now(), other.now());
    }

    #[tokio::test]
    async fn mock_sleep_waits_for_advance() {
        let clock = MockClock::new();
        let mut sleep = clock.sleep(Duration::from_secs(2));

        assert!(is_pending(&mut sleep).await);
        clock.advance(Duration::from_secs(1));
        assert!(is_pending(&mut sleep).await);
        clock.advance(Duration::from_secs(1));
        assert!(!is_pending(&mut sleep).await);
    }

    #[tokio::test]
    async fn mock_sleep_deadline_fixed_at_creation() {
        let clock = MockClock::new();
        let sleep = clock.sleep(Duration::from_secs(1));
        // Time passes before the future is ever polled.
        clock.advance(Duration::from_secs(1));
        tokio::time::timeout(Duration::from_millis(100), sleep)
            .await
            .expect("sleep should already be due");
    }

    #[tokio::test]
    async fn mock_ticker_fires_once_per_interval() {
        let start = Instant::now();
        let clock = MockClock::starting_at(start);
        let mut ticker = clock.ticker(Duration::from_secs(1));

        {
            let mut tick = ticker.tick();
            assert!(is_pending(&mut tick).await);
        }

        clock.advance(Duration::from_secs(1));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(1));

        let mut tick = ticker.tick();
        assert!(is_pending(&mut tick).await);
        clock.advance(Duration::from_secs(1));
        assert_eq!(tick.await, start + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn mock_ticker_skips_missed_ticks() {
        let start = Instant::now();
        let clock = MockClock::starting_at(start);
        let mut ticker = clock.ticker(Duration::from_secs(1));

        clock.advance(Duration::from_millis(3500));
        assert_eq!(ticker.tick().await, start + Duration::from_secs(1));

        // Ticks at 2s and 3s were skipped; the next one is at 4s.
        let mut tick = ticker.tick();
        assert!(is_pending(&mut tick).await);
        clock.advance(Duration::from_millis(500));
        assert_eq!(tick.await, start + Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn system_ticker_first_tick_after_one_interval() {
        let clock = SystemClock;
        let created = clock.now();
        let mut ticker = clock.ticker(Duration::from_secs(5));

        let fired = ticker.tick().await;
        assert_eq!(fired.duration_since(created), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn system_sleep_uses_tokio_time() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_secs(3)).await;
        assert!(clock.now().duration_since(before) >= Duration::from_secs(3));
    }
}
