use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use health_poller::{HealthCheckConfig, HealthMonitor, MonitorConfig, start_health_check};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Format;

/// One printed health transition.
#[derive(Debug, Serialize)]
struct Transition<'a> {
    endpoint: &'a str,
    healthy: bool,
    /// Unix timestamp the transition was observed at.
    at: u64,
}

/// Watch a single URL until Ctrl-C.
pub async fn watch_url(config: HealthCheckConfig, format: Format) -> anyhow::Result<()> {
    let options = config.to_options()?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut signals = start_health_check(cancel, config.endpoint.as_str(), options);
    while let Some(healthy) = signals.recv().await {
        println!("{}", render(&config.endpoint, healthy, epoch_secs(), format)?);
    }

    Ok(())
}

/// Watch every endpoint listed in a config file until Ctrl-C.
pub async fn watch_config(path: &Path, format: Format) -> anyhow::Result<()> {
    let config = MonitorConfig::from_file(path)?;
    anyhow::ensure!(
        !config.endpoints.is_empty(),
        "no endpoints configured in {}",
        path.display()
    );

    let cancel = CancellationToken::new();
    let monitor = HealthMonitor::with_cancellation(cancel.clone());
    let (tx, mut rx) = mpsc::channel::<(String, bool)>(config.endpoints.len());

    for entry in &config.endpoints {
        let options = entry.health.to_options()?;
        let mut signals = monitor
            .start_monitor(&entry.name, &entry.health.endpoint, options)
            .await;

        let tx = tx.clone();
        let name = entry.name.clone();
        tokio::spawn(async move {
            while let Some(healthy) = signals.recv().await {
                if tx.send((name.clone(), healthy)).await.is_err() {
                    break;
                }
            }
        });
    }
    // Only the forwarders hold senders now; the loop below ends when they do.
    drop(tx);

    info!(endpoints = config.endpoints.len(), path = %path.display(), "watching endpoints");
    cancel_on_ctrl_c(cancel);

    while let Some((name, healthy)) = rx.recv().await {
        println!("{}", render(&name, healthy, epoch_secs(), format)?);
    }

    Ok(())
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(e) => warn!(error = %e, "failed to install Ctrl-C handler; stopping"),
        }
        cancel.cancel();
    });
}

fn render(endpoint: &str, healthy: bool, at: u64, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string(&Transition {
            endpoint,
            healthy,
            at,
        })?,
        Format::Text if healthy => format!("✓ {endpoint} healthy"),
        Format::Text => format!("✗ {endpoint} unhealthy"),
    })
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
