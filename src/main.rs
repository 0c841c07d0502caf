//! # Front Door Certificate Sync
//!
//! Scheduled job that keeps Azure Front Door HTTPS certificate references in
//! sync with the latest Azure Key Vault certificate versions.
//!
//! ## Overview
//!
//! On every tick of the schedule (daily at midnight UTC by default) the job:
//!
//! 1. **Lists Front Doors** - every Front Door in the subscription, then its frontend endpoints
//! 2. **Filters** - keeps endpoints whose HTTPS certificate comes from Key Vault
//! 3. **Compares** - fetches the latest certificate version from the endpoint's vault
//! 4. **Updates** - re-points stale endpoints at the latest version via `enableHttps`
//!
//! ## Usage
//!
//! ```bash
//! # Run on the configured schedule until SIGTERM
//! frontdoor-cert-sync
//!
//! # Single run for an external scheduler (exit code reflects the result)
//! frontdoor-cert-sync --once
//!
//! # Report what would change without updating anything
//! frontdoor-cert-sync --once --dry-run
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use frontdoor_cert_sync::config::JobConfig;
use frontdoor_cert_sync::observability::{self, logging};
use frontdoor_cert_sync::runtime::{build_job, shutdown_signal};
use frontdoor_cert_sync::scheduler::{self, CronSchedule};
use frontdoor_cert_sync::server::{start_server, ServerState};
use std::sync::Arc;
use tracing::{error, info};

/// Front Door Certificate Sync
#[derive(Parser, Debug)]
#[command(name = "frontdoor-cert-sync", version, about, long_about = None)]
struct Cli {
    /// Run a single sync and exit instead of scheduling
    #[arg(long)]
    once: bool,

    /// Report stale endpoints without updating them (overrides DRY_RUN)
    #[arg(long)]
    dry_run: bool,

    /// Cron schedule, seconds first (overrides SCHEDULE)
    #[arg(long, value_name = "CRON")]
    schedule: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider FIRST, before any other operations
    // Required for rustls 0.23+ when no default provider is set via features
    // We use ring as the crypto provider
    rustls::crypto::ring::default_provider()
        .install_default()
        .unwrap_or_else(|_| panic!("Failed to install rustls crypto provider"));

    let cli = Cli::parse();

    let mut config = JobConfig::from_env();
    if cli.dry_run {
        config.dry_run = true;
    }
    if let Some(schedule) = cli.schedule {
        config.schedule = schedule;
    }

    logging::init_tracing(&config)?;

    info!("Starting Front Door Certificate Sync");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let job = build_job(&config).context("Failed to initialize certificate sync job")?;

    if cli.once {
        let report = scheduler::run_once(&job).await?;
        info!(
            "Certificate sync finished: {} Front Door(s), {} endpoint(s), {} stale, {} updated",
            report.front_doors, report.endpoints, report.stale, report.updated
        );
        return Ok(());
    }

    let schedule = CronSchedule::parse(&config.schedule)?;

    let server_state = Arc::new(ServerState::default());
    if config.enable_metrics {
        let server_state_clone = Arc::clone(&server_state);
        let server_port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = start_server(server_port, server_state_clone).await {
                error!("HTTP server error: {}", e);
            }
        });
    }
    server_state.mark_ready();

    scheduler::run_scheduled(&job, &schedule, config.run_on_startup, shutdown_signal()).await;

    info!("Front Door Certificate Sync stopped");
    Ok(())
}
