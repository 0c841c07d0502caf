//! # Scheduler
//!
//! Cron-driven loop around [`CertificateSyncJob::run`].
//!
//! Expressions use the `cron` crate's seconds-first format
//! (`sec min hour day-of-month month day-of-week`); classic 5-field
//! expressions get a leading `0` seconds field. Fire times are computed in
//! UTC. Runs never overlap: the next fire time is computed after the
//! previous run returns, so ticks missed while a run is in progress are
//! skipped. A failed run is logged and counted and the loop keeps going.

use crate::observability::metrics;
use crate::sync::{CertificateSyncJob, SyncReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::str::FromStr;
use std::time::Instant;
use tracing::{error, info};

/// Parsed cron schedule
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    /// Parse a 5-, 6- or 7-field cron expression
    ///
    /// # Errors
    /// Returns an error if the expression is not valid cron
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        // cron crate expects 6-field (with seconds) or 7-field expressions
        let full_expr = if trimmed.split_whitespace().count() == 5 {
            format!("0 {trimmed}")
        } else {
            trimmed.to_string()
        };

        let schedule = Schedule::from_str(&full_expr)
            .with_context(|| format!("Invalid cron expression '{expression}'"))?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}

/// Run the job once and record run metrics
///
/// # Errors
/// Returns the job's error unchanged
pub async fn run_once(job: &CertificateSyncJob) -> Result<SyncReport> {
    metrics::increment_runs();
    let start = Instant::now();

    let result = job.run().await;
    metrics::observe_run_duration(start.elapsed().as_secs_f64());

    match &result {
        Ok(_) => metrics::set_last_success_timestamp(Utc::now().timestamp()),
        Err(_) => metrics::increment_run_errors(),
    }

    result
}

/// Run the job on `schedule` until `shutdown` resolves
///
/// A run in progress when `shutdown` resolves is finished first.
pub async fn run_scheduled<F>(
    job: &CertificateSyncJob,
    schedule: &CronSchedule,
    run_on_startup: bool,
    shutdown: F,
) where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    info!("Scheduler started with schedule '{}'", schedule.expression());

    if run_on_startup {
        info!("Running certificate sync on startup");
        log_run_result(run_once(job).await);
    }

    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(now) else {
            error!(
                "Schedule '{}' has no upcoming fire time, stopping scheduler",
                schedule.expression()
            );
            return;
        };

        let delay = (next - now).to_std().unwrap_or_default();
        info!("Next certificate sync at {} (in {}s)", next.to_rfc3339(), delay.as_secs());

        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested, stopping scheduler");
                return;
            }
            () = tokio::time::sleep(delay) => {
                log_run_result(run_once(job).await);
            }
        }
    }
}

fn log_run_result(result: Result<SyncReport>) {
    match result {
        Ok(report) => info!(
            "Certificate sync succeeded: {} endpoint(s) scanned, {} updated",
            report.endpoints, report.updated
        ),
        Err(e) => error!("Certificate sync failed: {:#}", e),
    }
}
