//! Health poller scheduling: the background task that drives probes.
//!
//! [`start_health_check`] spawns one task per endpoint. The task waits out
//! the initial delay, then probes on every clock tick and forwards health
//! transitions on a channel. Cancelling the token, or dropping the receiver,
//! stops the task and closes the channel. [`HealthMonitor`] keeps a set of
//! named pollers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::BoxFuture;
use crate::checker::HealthTracker;
use crate::options::{HealthCheckOption, HealthCheckOptions};
use crate::probe::{HttpProber, Prober};

/// Signals buffered before the poller blocks on a slow consumer.
const SIGNAL_BUFFER: usize = 1;

/// Start polling `endpoint` in the background.
///
/// Returns immediately with the receiving end of the health transition
/// stream: `true` when the endpoint becomes healthy, `false` when it becomes
/// unhealthy. The stream ends once `cancel` is cancelled. Dropping the
/// receiver stops the poller too.
///
/// Must be called from within a tokio runtime.
pub fn start_health_check<I>(
    cancel: CancellationToken,
    endpoint: impl Into<String>,
    options: I,
) -> mpsc::Receiver<bool>
where
    I: IntoIterator<Item = HealthCheckOption>,
{
    let (rx, _task) = spawn_http_poller(
        cancel,
        endpoint,
        HealthCheckOptions::from_options(options),
    );
    rx
}

fn spawn_http_poller(
    cancel: CancellationToken,
    endpoint: impl Into<String>,
    options: HealthCheckOptions,
) -> (mpsc::Receiver<bool>, JoinHandle<()>) {
    let prober = HttpProber::new(
        endpoint,
        options.request_timeout(),
        options.success_status_code(),
    );
    let label = prober.endpoint().to_string();
    spawn_poller(cancel, label, Arc::new(prober), options)
}

/// Spawn the poller task for an arbitrary prober.
pub(crate) fn spawn_poller(
    cancel: CancellationToken,
    endpoint: String,
    prober: Arc<dyn Prober>,
    options: HealthCheckOptions,
) -> (mpsc::Receiver<bool>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);

    // The delay is measured from start, not from when the task first runs.
    let delay = (!options.initial_delay().is_zero())
        .then(|| options.clock().sleep(options.initial_delay()));

    info!(
        %endpoint,
        interval = ?options.interval(),
        initial_delay = ?options.initial_delay(),
        failure_threshold = options.failure_threshold(),
        "health poller starting"
    );

    let task = tokio::spawn(run_poller(cancel, endpoint, prober, options, delay, tx));
    (rx, task)
}

/// The poll loop for a single endpoint.
async fn run_poller(
    cancel: CancellationToken,
    endpoint: String,
    prober: Arc<dyn Prober>,
    options: HealthCheckOptions,
    delay: Option<BoxFuture<'static, ()>>,
    tx: mpsc::Sender<bool>,
) {
    if let Some(delay) = delay {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%endpoint, "health poller cancelled during initial delay");
                return;
            }
            _ = tx.closed() => {
                debug!(%endpoint, "health signal receiver dropped during initial delay");
                return;
            }
            _ = delay => {}
        }
    }

    // Created only after the delay: ticks before it must not probe.
    let mut ticker = options.clock().ticker(options.interval());
    let mut tracker = HealthTracker::new(options.failure_threshold());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tx.closed() => {
                debug!(%endpoint, "health signal receiver dropped");
                break;
            }
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tx.closed() => {
                debug!(%endpoint, "health signal receiver dropped");
                break;
            }
            result = prober.probe() => result,
        };

        let Some(healthy) = tracker.observe(result) else {
            continue;
        };

        info!(%endpoint, healthy, "endpoint health changed");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = tx.send(healthy) => {
                if sent.is_err() {
                    debug!(%endpoint, "health signal receiver dropped");
                    break;
                }
            }
        }
    }

    info!(%endpoint, "health poller stopped");
}

/// A running poller owned by a [`HealthMonitor`].
struct MonitorSlot {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MonitorSlot {
    fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

/// Manages health pollers for a set of named endpoints.
///
/// Dropping the monitor stops every poller it started.
pub struct HealthMonitor {
    /// Parent of every poller's token.
    root: CancellationToken,
    /// Registered pollers: name → slot.
    monitors: Arc<RwLock<HashMap<String, MonitorSlot>>>,
}

impl HealthMonitor {
    /// Create a new health monitor.
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    /// Create a monitor whose pollers all stop when `parent` is cancelled.
    pub fn with_cancellation(parent: CancellationToken) -> Self {
        Self {
            root: parent.child_token(),
            monitors: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start polling `endpoint` under `name`.
    ///
    /// A poller already running under the same name is stopped and
    /// replaced; its stream ends.
    pub async fn start_monitor<I>(
        &self,
        name: &str,
        endpoint: &str,
        options: I,
    ) -> mpsc::Receiver<bool>
    where
        I: IntoIterator<Item = HealthCheckOption>,
    {
        let token = self.root.child_token();
        let (rx, task) = spawn_http_poller(
            token.clone(),
            endpoint,
            HealthCheckOptions::from_options(options),
        );

        let mut monitors = self.monitors.write().await;
        if let Some(old) = monitors.insert(name.to_string(), MonitorSlot { token, task }) {
            old.token.cancel();
            debug!(%name, "replaced existing health poller");
        }

        info!(%name, %endpoint, "health monitor started");
        rx
    }

    /// Stop the poller registered under `name`. Returns whether one existed.
    pub async fn stop_monitor(&self, name: &str) -> bool {
        let mut monitors = self.monitors.write().await;
        match monitors.remove(name) {
            Some(slot) => {
                slot.token.cancel();
                info!(%name, "health monitor stopped");
                true
            }
            None => false,
        }
    }

    /// Stop all pollers (for graceful shutdown).
    pub async fn stop_all(&self) {
        let mut monitors = self.monitors.write().await;
        for (name, slot) in monitors.drain() {
            slot.token.cancel();
            debug!(%name, "health monitor stopped");
        }
        info!("all health monitors stopped");
    }

    /// Names of pollers that are still running, sorted.
    ///
    /// Pollers that ended on their own (receiver dropped, parent token
    /// cancelled) are forgotten here.
    pub async fn active_monitors(&self) -> Vec<String> {
        let mut monitors = self.monitors.write().await;
        monitors.retain(|name, slot| {
            let running = slot.is_running();
            if !running {
                debug!(%name, "forgetting finished health poller");
            }
            running
        });
        let mut names: Vec<String> = monitors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a running poller is registered under `name`.
    pub async fn is_monitoring(&self, name: &str) -> bool {
        let monitors = self.monitors.read().await;
        monitors.get(name).is_some_and(MonitorSlot::is_running)
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
