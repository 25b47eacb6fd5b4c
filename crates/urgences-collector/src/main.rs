//! Urgences Collector - collection entry point

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use urgences_collector::{config::CollectorConfig, pipeline};
use urgences_common::logging::{init_logging, LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "urgences-collector")]
#[command(author, version, about = "Quebec emergency-room occupancy collector")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag; environment variables
    // take precedence
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::console(log_level)
        .with_env_overrides()
        .unwrap_or_else(|_| LogConfig::console(log_level));

    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match collect(&cli.config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Run aborted");
            ExitCode::FAILURE
        },
    }
}

/// Execute one collection run; `Ok(true)` means every batch was accepted
async fn collect(config_path: &str) -> Result<bool> {
    let config = CollectorConfig::load(config_path)?;
    info!(config = %config_path, url = %config.data_source.url, "Starting collection run");

    let summary = pipeline::run(&config).await?;

    if !summary.succeeded() {
        error!(
            records = summary.records,
            batches_failed = summary.batches_failed,
            "Collection run failed"
        );
    }
    Ok(summary.succeeded())
}
