mod config;

use clap::Parser;
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "launchpad", about = "Launch scheduling and catalog synchronization")]
enum CliCommand {
    /// Serve the launches API
    Launches(ConfigArgs),
    /// Load and validate a config file, then exit
    CheckConfig(ConfigArgs),
}

#[derive(clap::Args)]
struct ConfigArgs {
    #[arg(long = "config", default_value = "launchpad.yaml")]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start metrics exporter: {0}")]
    Metrics(String),
    #[error("could not build runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Launches(#[from] launches::LaunchesError),
}

fn main() {
    let cli = CliCommand::parse();

    if let Err(e) = cli_main(cli) {
        eprintln!("launchpad: {e}");
        process::exit(1);
    }
}

fn cli_main(cli: CliCommand) -> Result<(), CliError> {
    match cli {
        CliCommand::Launches(args) => {
            let config = Config::from_file(&args.config_file_path)?;
            let _sentry = init_logging(config.common.logging.as_ref());
            if let Some(metrics_config) = &config.common.metrics {
                init_metrics(metrics_config)?;
            }

            tracing::info!("starting launches");
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            rt.block_on(launches::run(config.launches))?;
            Ok(())
        }
        CliCommand::CheckConfig(args) => {
            Config::from_file(&args.config_file_path)?;
            println!("{}: ok", args.config_file_path.display());
            Ok(())
        }
    }
}

/// Installs the tracing subscriber, forwarding events to Sentry when a DSN
/// is configured. The returned guard flushes Sentry on drop.
fn init_logging(logging: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let guard = logging.map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: logging.environment.clone().map(Into::into),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(config.prefix.as_str()))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_all(launches::metrics_defs::ALL_METRICS);
    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "statsd metrics enabled"
    );
    Ok(())
}
