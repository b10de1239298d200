mod cli;
mod scenarios;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use taskpace_core::{load_dotenv, DispatchConfig};

use crate::cli::{CliArgs, Scenario};

/// Layer CLI overrides on top of the file or environment config.
fn resolve_config(args: &CliArgs) -> Result<DispatchConfig> {
    let mut config = match &args.config {
        Some(path) => DispatchConfig::from_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => DispatchConfig::from_env().context("invalid dispatch config in environment")?,
    };
    if let Some(delay) = args.delay_ms {
        config.nominal_delay_ms = delay;
    }
    if let Some(jitter) = args.jitter_ms {
        config.jitter_ms = jitter;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(policy) = args.failure_policy {
        config.failure_policy = policy;
    }
    config.debug |= args.debug;
    config.validate().context("invalid dispatch config")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let args = CliArgs::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = resolve_config(&args)?;
    config.log_summary();
    let work = Duration::from_millis(args.work_ms);

    if matches!(args.scenario, Scenario::Sync | Scenario::All) {
        scenarios::run_sync(&config, args.tasks, work, args.json).await?;
    }
    if matches!(args.scenario, Scenario::Async | Scenario::All) {
        scenarios::run_async(&config, args.tasks, work, args.json).await?;
    }
    if matches!(args.scenario, Scenario::Queue | Scenario::All) {
        scenarios::run_queue(config.concurrency, args.tasks, work).await?;
    }

    info!("All scenarios finished");
    Ok(())
}
