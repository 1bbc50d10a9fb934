use health_poller::{HealthCheckConfig, HealthCheckOptions, HttpProber, ProbeResult, Prober};

/// Probe the configured endpoint once and print the verdict.
pub async fn check(config: &HealthCheckConfig) -> anyhow::Result<bool> {
    let options = HealthCheckOptions::from_options(config.to_options()?);
    let prober = HttpProber::new(
        config.endpoint.as_str(),
        options.request_timeout(),
        options.success_status_code(),
    );

    match prober.probe().await {
        ProbeResult::Success => {
            println!("✓ {} is healthy", config.endpoint);
            Ok(true)
        }
        ProbeResult::Failure => {
            eprintln!(
                "✗ {} is unhealthy (expected status {} within {:?})",
                config.endpoint,
                options.success_status_code().as_u16(),
                options.request_timeout()
            );
            Ok(false)
        }
    }
}
