use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use health_poller::HealthCheckConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "healthpoll",
    about = "healthpoll — watch HTTP endpoints and report health transitions",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll endpoints and print every health transition until Ctrl-C.
    Watch {
        /// Endpoint URL to watch
        #[arg(required_unless_present = "config")]
        url: Option<String>,
        /// TOML file listing named endpoints to watch
        #[arg(
            short,
            long,
            conflicts_with_all = ["url", "interval", "initial_delay", "failure_threshold", "timeout", "success_status"]
        )]
        config: Option<PathBuf>,
        #[command(flatten)]
        tuning: TuningArgs,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Probe an endpoint once. Exits non-zero if the probe fails.
    Check {
        /// Endpoint URL to probe
        url: String,
        /// Probe timeout (e.g. 2s, 500ms)
        #[arg(long)]
        timeout: Option<String>,
        /// Status code that counts as healthy
        #[arg(long)]
        success_status: Option<u16>,
    },
}

/// Poller tuning for a single watched URL. Unset values use the defaults.
#[derive(Args, Debug, Default)]
struct TuningArgs {
    /// Time between probes (e.g. 5s, 500ms, 1m)
    #[arg(long)]
    interval: Option<String>,
    /// Time to wait before the first probe
    #[arg(long)]
    initial_delay: Option<String>,
    /// Consecutive failed probes before reporting unhealthy
    #[arg(long)]
    failure_threshold: Option<u32>,
    /// Probe timeout
    #[arg(long)]
    timeout: Option<String>,
    /// Status code that counts as healthy
    #[arg(long)]
    success_status: Option<u16>,
}

impl TuningArgs {
    fn into_config(self, url: String) -> HealthCheckConfig {
        HealthCheckConfig {
            endpoint: url,
            interval: self.interval,
            initial_delay: self.initial_delay,
            request_timeout: self.timeout,
            failure_threshold: self.failure_threshold,
            success_status_code: self.success_status,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the transitions.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,healthpoll=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            url,
            config,
            tuning,
            format,
        } => match (config, url) {
            (Some(path), _) => commands::watch::watch_config(&path, format).await,
            (None, Some(url)) => commands::watch::watch_url(tuning.into_config(url), format).await,
            (None, None) => anyhow::bail!("either a URL or --config is required"),
        },
        Commands::Check {
            url,
            timeout,
            success_status,
        } => {
            let config = TuningArgs {
                timeout,
                success_status,
                ..TuningArgs::default()
            }
            .into_config(url);

            if !commands::check::check(&config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
