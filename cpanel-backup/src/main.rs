//! cPanel Backup - Main entry point
//!
//! Runs exactly one backup and exits 0 on success, 1 on failure.

use anyhow::{Context, Result};
use clap::Parser;
use cpanel_backup::{api::BackupRequest, config::Config, utils, BackupOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Fail the run when cPanel reports the backup job as failed
    #[arg(long)]
    strict: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::default().to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    // Load configuration
    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    if args.strict {
        config.api.strict_status = true;
    }
    config.validate().context("invalid configuration")?;

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!(
        "Starting cpanel-backup v{} (account: {}@{}, transfer: {})",
        env!("CARGO_PKG_VERSION"),
        config.api.user,
        config.api.host,
        config.transfer.method
    );

    let orchestrator = BackupOrchestrator::from_config(&config)?;
    let report = orchestrator
        .run(&BackupRequest::new(config.notify.address.clone()))
        .await;

    match report.to_json() {
        Ok(json) => tracing::debug!("Run report: {}", json),
        Err(e) => tracing::warn!("Failed to serialize run report: {}", e),
    }

    Ok(ExitCode::from(report.result.exit_code()))
}
