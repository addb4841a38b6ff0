use clap::{Args, Parser};
use config::{Config, ConfigError};
use relay::errors::RelayServiceError;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod logging;
mod telemetry;

#[derive(Parser)]
#[command(about = "Relays HTTP requests on behalf of API workspace users")]
enum CliCommand {
    /// Run the relay service
    Relay(ConfigArgs),
    /// Load and validate the configuration, then exit
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] telemetry::MetricsError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Relay(#[from] RelayServiceError),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match &cli {
        CliCommand::Relay(args) => run_relay(&args.config),
        CliCommand::CheckConfig(args) => check_config(&args.config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_relay(path: &Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    let relay_config = config.relay.ok_or(ConfigError::MissingSection("relay"))?;

    let _sentry_guard = logging::init(config.common.logging.as_ref());
    if let Some(metrics) = &config.common.metrics {
        telemetry::init(metrics)?;
    }

    tracing::info!(config = %path.display(), "Starting relay");
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(relay::run(relay_config))?;

    Ok(())
}

fn check_config(path: &Path) -> Result<(), CliError> {
    let config = Config::from_file(path)?;
    if config.relay.is_none() {
        return Err(ConfigError::MissingSection("relay").into());
    }

    println!("{}: ok", path.display());
    Ok(())
}
