//! redrive: re-invokes the failed items sitting in a Lambda dead-letter queue.
//!
//! Every message is redriven against the function named in its request
//! context and deleted once that invocation succeeds. The run ends when the
//! queue comes back empty, on the first failure, or on SIGINT/SIGTERM.

use clap::Parser;
use snafu::prelude::*;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use redrive::config::{Config, FailurePolicy, Overrides};
use redrive::error::{AddressParseSnafu, AppError, ConfigSnafu, MetricsSnafu, RedriveSnafu};
use redrive::{RedriveStats, Redriver, aws, signal};

/// Lambda dead-letter queue redrive tool.
#[derive(Parser, Debug)]
#[command(name = "redrive")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dead-letter queue URL. Overrides `queue_url` from the file.
    #[arg(short, long)]
    queue_url: Option<String>,

    /// Leave failing messages on the queue instead of aborting the run.
    #[arg(long)]
    skip_failures: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without touching the queue.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("redrive starting");

    let config = build_config(&args)?;

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Queue: {}", config.queue_url);
        info!(
            "Receive: {} messages, {}s wait",
            config.receive.max_messages, config.receive.wait_time_secs
        );
        info!("Replay fetch limit: {}", config.replay.max_fetches);
        info!("Failure policy: {:?}", config.failure_policy);
        if let Some(region) = &config.aws.region {
            info!("Region: {}", region);
        }
        info!("Configuration is valid");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signals = signal::cancel_on_signal(shutdown.clone());

    // Initialize metrics if enabled
    if config.metrics.enabled {
        let addr = config.metrics.address.parse().context(AddressParseSnafu)?;
        redrive::metrics::init(addr, shutdown.clone()).context(MetricsSnafu)?;
        debug!("Metrics enabled on {}", config.metrics.address);
    }

    let services = aws::services(&config.aws, &config.queue_url).await;
    let mut redriver = Redriver::new(&config, services, shutdown.clone());
    let result = redriver.run().await;

    log_stats(redriver.stats());

    // Stops the metrics server and the signal watcher.
    shutdown.cancel();
    let _ = signals.await;

    result.context(RedriveSnafu)?;
    info!("Redrive completed successfully");
    Ok(())
}

/// Build configuration from the file (if any) and command-line overrides.
fn build_config(args: &Args) -> Result<Config, AppError> {
    let overrides = Overrides {
        queue_url: args.queue_url.clone(),
        failure_policy: args.skip_failures.then_some(FailurePolicy::SkipAndContinue),
    };
    Config::load(args.config.as_deref(), overrides).context(ConfigSnafu)
}

fn log_stats(stats: &RedriveStats) {
    info!("  Batches: {}", stats.batches);
    info!("  Messages received: {}", stats.received);
    info!("  Messages redriven: {}", stats.redriven);
    info!("  Messages deleted: {}", stats.deleted);
    if stats.skipped > 0 {
        info!("  Messages skipped: {}", stats.skipped);
    }
    if stats.delete_failures > 0 {
        info!("  Delete failures: {}", stats.delete_failures);
    }
}
