use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError};
use forwarder::ForwarderError;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;
mod statsd;

#[derive(Parser)]
#[command(about = "Forwards CRM contact webhooks to Mailchimp")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the webhook and admin listeners
    Run(ConfigArgs),
    /// Load and validate the configuration, then print a summary
    CheckConfig(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// YAML configuration file. Environment variables override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid sentry DSN: {0}")]
    Sentry(#[from] sentry::types::ParseDsnError),
    #[error(transparent)]
    Statsd(#[from] statsd::StatsdInitError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Forwarder(#[from] ForwarderError),
}

fn main() -> ExitCode {
    // Only fills variables that are not already set
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let result = match cli.command {
        CliCommand::Run(args) => run(args),
        CliCommand::CheckConfig(args) => check_config(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: ConfigArgs) -> Result<(), CliError> {
    let config = Config::load(args.config.as_deref())?;

    let _sentry = logging::init(config.common.logging.as_ref())?;
    if let Some(metrics) = &config.common.metrics {
        statsd::init(metrics)?;
    }

    tracing::info!(
        listener = %config.forwarder.listener.address(),
        admin_listener = %config.forwarder.admin_listener.address(),
        "Starting bridge"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(forwarder::run(config.forwarder)).map_err(|e| {
        tracing::error!(error = %e, "Bridge stopped");
        CliError::from(e)
    })
}

fn check_config(args: ConfigArgs) -> Result<(), CliError> {
    let config = Config::load(args.config.as_deref())?;
    config
        .forwarder
        .validate()
        .map_err(ForwarderError::from)?;

    let forwarder = &config.forwarder;
    println!("listener:       {}", forwarder.listener.address());
    println!("admin listener: {}", forwarder.admin_listener.address());
    println!("mailchimp:      {:?}", forwarder.mailchimp);

    let missing = forwarder.mailchimp.missing_fields();
    if missing.is_empty() {
        println!("credentials:    complete");
    } else {
        println!("credentials:    missing {}", missing.join(", "));
    }

    if forwarder.allowed_tags.is_empty() {
        println!("allowed tags:   any");
    } else {
        println!("allowed tags:   {}", forwarder.allowed_tags.join(", "));
    }

    match &config.common.metrics {
        Some(metrics) => println!(
            "metrics:        statsd {}:{}",
            metrics.statsd_host, metrics.statsd_port
        ),
        None => println!("metrics:        disabled"),
    }
    println!(
        "sentry:         {}",
        if config.common.logging.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    Ok(())
}
