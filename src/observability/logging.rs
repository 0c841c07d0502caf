//! # Logging
//!
//! `tracing` subscriber setup. `RUST_LOG` wins when set; otherwise the
//! filter is built from `LOG_LEVEL` for this crate only.

use crate::config::{JobConfig, LogFormat};
use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directive for a log level, scoped to this crate
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    let level = match log_level.trim().to_lowercase().as_str() {
        "error" => "error",
        "warn" | "warning" => "warn",
        "debug" => "debug",
        "trace" => "trace",
        _ => "info",
    };
    format!("frontdoor_cert_sync={level}")
}

/// Install the global tracing subscriber
///
/// # Errors
/// Returns an error if a global subscriber is already installed
pub fn init_tracing(config: &JobConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init(),
    };

    result.map_err(|e| anyhow!("Failed to initialize tracing subscriber: {e}"))
}
