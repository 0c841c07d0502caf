//! # Runtime
//!
//! Wiring between configuration, the Azure clients and the sync job, plus
//! process signal handling.

use crate::config::JobConfig;
use crate::provider::azure::{build_credential, FrontDoorClient, KeyVaultCertificates};
use crate::sync::CertificateSyncJob;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the sync job with the Azure clients described by `config`
///
/// # Errors
/// Returns an error if the configuration is invalid or a client cannot be created
pub fn build_job(config: &JobConfig) -> Result<CertificateSyncJob> {
    config.validate()?;
    let subscription_id = config.require_subscription_id()?;

    if config.pact_mode {
        info!(
            "PACT_MODE enabled: Front Door endpoint {}, Key Vault endpoint {:?}",
            config.management_endpoint, config.key_vault_endpoint
        );
    }

    let credential = build_credential(&config.auth)?;

    let vault = KeyVaultCertificates::new(
        Arc::clone(&credential),
        config.key_vault_endpoint.clone(),
    )
    .context("Failed to create Key Vault client")?;

    let front_door = FrontDoorClient::new(
        credential,
        &config.management_endpoint,
        subscription_id,
        config.poll_settings(),
    )
    .context("Failed to create Front Door client")?;

    Ok(CertificateSyncJob::new(Arc::new(vault), Arc::new(front_door)).with_dry_run(config.dry_run))
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
